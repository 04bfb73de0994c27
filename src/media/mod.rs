//! Media file classification and path checks.
//!
//! Both run before any processing stage is created, so an invalid request
//! never allocates engine resources.

pub mod access;
pub mod extension;

pub use access::{check_input, check_output};
pub use extension::{AudioFormat, ImageFormat, MediaCategory, MediaKind, VideoFormat, classify};
