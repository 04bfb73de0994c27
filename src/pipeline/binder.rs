//! Completes edges whose producer port only appears once decoding starts.
//!
//! Handlers run on an engine thread concurrently with the control loop. They
//! capture only their [`DeferredEdge`], never the pipeline.

use crate::defaults;
use crate::engine::{PortRef, StreamPort, StreamReadyHandler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// What a stream announcement did to its deferred edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// This port completed the edge.
    Bound,
    /// The target was already linked; nothing changed.
    AlreadyLinked,
    /// The stream is not raw audio, or its type is unknown.
    Ignored,
    /// The engine refused the link.
    LinkFailed,
}

/// A planned `producer -> target` edge waiting for a matching stream.
#[derive(Debug)]
pub struct DeferredEdge {
    producer: String,
    target: PortRef,
    accepted_prefix: &'static str,
    bound: AtomicBool,
}

impl DeferredEdge {
    /// Edge accepting raw audio streams only.
    pub fn new(producer: &str, target: PortRef) -> Self {
        Self {
            producer: producer.to_string(),
            target,
            accepted_prefix: defaults::RAW_AUDIO_TYPE,
            bound: AtomicBool::new(false),
        }
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn target(&self) -> &PortRef {
        &self.target
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Handler to register with the engine for the producer's new ports.
    pub fn handler(self: &Arc<Self>) -> StreamReadyHandler {
        let edge = Arc::clone(self);
        Arc::new(move |port: &dyn StreamPort| {
            edge.on_stream_ready(port);
        })
    }

    /// Bind `port` to the target if it carries raw audio and the target is
    /// still free. At most one port ever completes the edge.
    pub fn on_stream_ready(&self, port: &dyn StreamPort) -> BindOutcome {
        debug!(
            producer = port.producer(),
            port = port.name(),
            target = %self.target,
            "stream ready"
        );

        if self.is_bound() || port.is_target_linked(&self.target) {
            debug!(target = %self.target, "target already linked, ignoring");
            return BindOutcome::AlreadyLinked;
        }

        let Some(stream_type) = port.negotiated_type() else {
            debug!(port = port.name(), "stream type unknown, ignoring");
            return BindOutcome::Ignored;
        };
        if !stream_type.starts_with(self.accepted_prefix) {
            debug!(port = port.name(), %stream_type, "not raw audio, ignoring");
            return BindOutcome::Ignored;
        }

        if self
            .bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return BindOutcome::AlreadyLinked;
        }

        match port.link_to(&self.target) {
            Ok(()) => {
                info!(
                    port = port.name(),
                    target = %self.target,
                    %stream_type,
                    "decoded stream linked"
                );
                BindOutcome::Bound
            }
            Err(e) => {
                self.bound.store(false, Ordering::Release);
                warn!(
                    port = port.name(),
                    target = %self.target,
                    %stream_type,
                    error = %e,
                    "failed to link decoded stream"
                );
                BindOutcome::LinkFailed
            }
        }
    }
}
