//! nightcore - Nightcore-style audio transformation pipelines
//!
//! Builds one short-lived processing graph per request (pitch/tempo, bass
//! boost, reverb, optional still-image video), runs it on an external
//! processing-element engine and reports a single typed outcome.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod media;
pub mod params;
pub mod pipeline;

// Entry points
pub use app::{run_request, save_parameters, speed_up_video, transcode, transcode_with_thumbnail};

// Engine boundary
pub use engine::{Engine, Session, StreamPort};

// Pipeline
pub use pipeline::{IoPaths, Mode, Pipeline, Request};

// Error handling
pub use error::{ErrorKind, NightcoreError, Outcome, Result};

// Config
pub use config::Config;
pub use params::{EffectParameters, RawEffectParameters};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
