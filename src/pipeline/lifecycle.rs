//! Pipeline lifecycle and the blocking bus loop.

use crate::engine::{BusMessage, EngineState};
use crate::error::{ErrorKind, NightcoreError, Outcome, Result};
use crate::pipeline::graph::Pipeline;
use crate::pipeline::stage::StageKind;
use tracing::{debug, error, info, warn};

/// Coarse pipeline state as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Idle,
    Ready,
    Playing,
}

/// Error kind for a fault posted by a stage of `kind`.
///
/// `None` means the stage is not one the pipeline created (an engine-internal
/// helper).
pub fn translate_fault(kind: Option<StageKind>) -> ErrorKind {
    match kind {
        Some(StageKind::Source) => ErrorKind::InvalidInputFilePath,
        Some(StageKind::Decoder | StageKind::ImageDecoder) => ErrorKind::InvalidInputExtension,
        Some(StageKind::Sink) => ErrorKind::InvalidOutputFilePath,
        Some(_) | None => ErrorKind::CannotLinkElements,
    }
}

/// What the loop does after one message.
enum Step {
    Continue,
    Finish(Outcome),
}

impl Pipeline {
    /// Start the pipeline and block until it completes or faults.
    ///
    /// The pipeline is back at `Idle` with every stage released when this
    /// returns, whatever the outcome.
    pub fn run(mut self) -> Outcome {
        self.start()?;
        let outcome = self.message_loop();
        self.teardown();
        match &outcome {
            Ok(()) => info!(pipeline = self.name(), "pipeline finished"),
            Err(e) => debug!(pipeline = self.name(), kind = %e.kind(), "pipeline stopped"),
        }
        outcome
    }

    /// Request `Ready`, then `Playing`.
    pub fn start(&mut self) -> Result<()> {
        let steps = [
            (EngineState::Ready, LifecycleState::Ready),
            (EngineState::Playing, LifecycleState::Playing),
        ];
        for (target, state) in steps {
            match self.session.set_state(target) {
                Ok(change) => {
                    self.state = state;
                    info!(pipeline = self.name(), state = ?state, change = ?change, "pipeline state requested");
                }
                Err(e) => {
                    error!(pipeline = self.name(), target = ?target, error = %e, "unable to start pipeline");
                    // The engine may be half way into `target`.
                    self.state = state;
                    self.teardown();
                    return Err(NightcoreError::CannotStartPipeline {
                        pipeline: self.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn message_loop(&mut self) -> Outcome {
        loop {
            let message = match self.session.next_message() {
                Ok(message) => message,
                Err(e) => {
                    error!(pipeline = self.name(), error = %e, "bus unavailable");
                    return Err(NightcoreError::NullPointer {
                        what: format!("bus of pipeline '{}'", self.name()),
                    });
                }
            };
            if let Step::Finish(outcome) = self.handle(message) {
                return outcome;
            }
        }
    }

    fn handle(&self, message: BusMessage) -> Step {
        match message {
            BusMessage::Error {
                source,
                message,
                debug: detail,
            } => {
                error!(
                    stage = %source,
                    debug = detail.as_deref().unwrap_or("none"),
                    "error received: {message}"
                );
                let kind = translate_fault(self.kind_of(&source));
                Step::Finish(Err(NightcoreError::StageFault {
                    stage: source,
                    kind,
                    message,
                    debug: detail,
                }))
            }
            BusMessage::Eos => {
                info!(pipeline = self.name(), "end of stream reached");
                Step::Finish(Ok(()))
            }
            BusMessage::StateChanged {
                source,
                old,
                current,
                pending,
            } => {
                if source == self.name() {
                    info!(
                        pipeline = self.name(),
                        "state changed from {old:?} to {current:?} (pending {pending:?})"
                    );
                }
                Step::Continue
            }
            BusMessage::Other { source, type_name } => {
                warn!(
                    source = source.as_deref().unwrap_or("unknown"),
                    "unexpected bus message: {type_name}"
                );
                Step::Continue
            }
        }
    }

    /// Return to `Idle` and release every stage. Safe to call repeatedly.
    pub(crate) fn teardown(&mut self) {
        if self.state != LifecycleState::Idle {
            if let Err(e) = self.session.set_state(EngineState::Null) {
                warn!(pipeline = self.name(), error = %e, "failed to stop pipeline");
            }
            self.state = LifecycleState::Idle;
        }
        self.session.release();
    }
}
