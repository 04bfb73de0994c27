//! Boundary to the external processing-element engine.
//!
//! The orchestrator never touches DSP, codecs or containers itself. It asks an
//! [`Engine`] for a [`Session`] (one pipeline container), creates named stages
//! in it, links them, drives its state and reads its notification bus.
//!
//! Two implementations ship with the crate: [`mock::MockEngine`], a scripted
//! in-process engine, and `gst::GstEngine` (feature `gstreamer`).

#[cfg(feature = "gstreamer")]
pub mod gst;
pub mod mock;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by an engine backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no stage factory named '{factory}'")]
    UnknownFactory { factory: String },

    #[error("stage '{name}' could not be added: {message}")]
    AddFailed { name: String, message: String },

    #[error("no stage named '{name}'")]
    NoSuchStage { name: String },

    #[error("stage '{stage}' has no port '{port}'")]
    NoSuchPort { stage: String, port: String },

    #[error("stage '{stage}' rejected property '{key}': {message}")]
    Property {
        stage: String,
        key: String,
        message: String,
    },

    #[error("link {upstream} -> {downstream} refused: {reason}")]
    LinkRefused {
        upstream: String,
        downstream: String,
        reason: String,
    },

    #[error("muxer '{muxer}' has no free port compatible with {port}")]
    NoCompatiblePort { muxer: String, port: String },

    #[error("state change to {target:?} failed")]
    StateChange { target: EngineState },

    #[error("notification bus closed")]
    BusClosed,

    #[error("engine initialisation failed: {0}")]
    Init(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Typed property value applied to a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Path(PathBuf),
    F32(f32),
    F64(f64),
    U64(u64),
    I32(i32),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::Path(p) => write!(f, "{}", p.display()),
            PropertyValue::F32(v) => write!(f, "{v}"),
            PropertyValue::F64(v) => write!(f, "{v}"),
            PropertyValue::U64(v) => write!(f, "{v}"),
            PropertyValue::I32(v) => write!(f, "{v}"),
        }
    }
}

/// A named port on a named stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub stage: String,
    pub port: String,
}

impl PortRef {
    pub fn new(stage: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            port: port.into(),
        }
    }

    /// The always-present output port of a stage.
    pub fn src(stage: impl Into<String>) -> Self {
        Self::new(stage, "src")
    }

    /// The always-present input port of a stage.
    pub fn sink(stage: impl Into<String>) -> Self {
        Self::new(stage, "sink")
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stage, self.port)
    }
}

/// Engine-level run state, finer grained than the orchestrator's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// How a successful state change completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Success,
    Async,
    NoPreroll,
}

/// One notification from the pipeline bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
    Eos,
    StateChanged {
        source: String,
        old: EngineState,
        current: EngineState,
        pending: EngineState,
    },
    Other {
        source: Option<String>,
        type_name: String,
    },
}

/// A freshly announced output port of a producing stage.
///
/// Handed to stream-ready handlers on an engine thread; only exposes
/// negotiation metadata the engine already holds.
pub trait StreamPort {
    /// Name of the stage that produced the port.
    fn producer(&self) -> &str;

    /// Name of the new port.
    fn name(&self) -> &str;

    /// Negotiated type descriptor (e.g. `audio/x-raw`), if known.
    fn negotiated_type(&self) -> Option<String>;

    /// Whether `target` is already connected to some upstream port.
    fn is_target_linked(&self, target: &PortRef) -> bool;

    /// Link this port to `target`.
    fn link_to(&self, target: &PortRef) -> EngineResult<()>;
}

/// Callback fired when a stage announces a new output port.
pub type StreamReadyHandler = Arc<dyn Fn(&dyn StreamPort) + Send + Sync>;

/// Factory for pipeline sessions.
pub trait Engine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Create an empty pipeline container.
    fn new_session(&self, pipeline: &str) -> EngineResult<Box<dyn Session>>;
}

/// One pipeline container and everything it owns.
pub trait Session: Send {
    /// Name of the pipeline itself, as used in bus message sources.
    fn pipeline_name(&self) -> &str;

    /// Instantiate `factory` as a stage called `name`.
    fn add_stage(&mut self, factory: &str, name: &str) -> EngineResult<()>;

    fn set_property(&mut self, stage: &str, key: &str, value: &PropertyValue) -> EngineResult<()>;

    /// Link two stages through their default ports.
    fn link(&mut self, upstream: &str, downstream: &str) -> EngineResult<()>;

    /// Link two explicit ports.
    fn link_ports(&mut self, src: &PortRef, sink: &PortRef) -> EngineResult<()>;

    /// Find or request a free input port on `muxer` compatible with `src`.
    fn compatible_port(&mut self, muxer: &str, src: &PortRef) -> EngineResult<PortRef>;

    /// Register `handler` for new output ports of `stage`.
    fn on_stream_ready(&mut self, stage: &str, handler: StreamReadyHandler) -> EngineResult<()>;

    fn set_state(&mut self, state: EngineState) -> EngineResult<StateChange>;

    /// Block until the next error, end-of-stream or state-change message.
    fn next_message(&mut self) -> EngineResult<BusMessage>;

    /// Number of stages currently owned by the session.
    fn stage_count(&self) -> usize;

    /// Drop every stage and edge. Idempotent.
    fn release(&mut self);
}
