//! Per-request stage graphs: assembly, dynamic linking and lifecycle.
//!
//! ```text
//! source ─> decoder ~> convert ─> resample ─> pitch ─> reverb ─> bass ─┬─> [flac_convert] ─> encoder ─> sink
//!                  (deferred)                                          │
//!                                                                      └─> audio_mux_convert ─> audio_queue ─┐
//! image_source ─> image_decoder ─> video_convert ─> freeze ─> video_queue ──────────────────────────────────┴─> mux ─> sink
//! ```

pub mod binder;
pub mod builder;
pub mod graph;
pub mod lifecycle;
pub mod mux;
pub mod stage;

pub use binder::{BindOutcome, DeferredEdge};
pub use builder::{IoPaths, Mode, Plan, Request, build};
pub use graph::{Edge, EdgeKind, Pipeline};
pub use lifecycle::{LifecycleState, translate_fault};
pub use stage::{EncoderKind, Media, StageConfig, StageKind, StageNode};
