//! GStreamer backend.

use super::{
    BusMessage, Engine, EngineError, EngineResult, EngineState, PortRef, PropertyValue, Session,
    StateChange, StreamPort, StreamReadyHandler,
};
use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use tracing::{debug, warn};

/// Engine backed by the system GStreamer installation.
#[derive(Debug)]
pub struct GstEngine {
    _private: (),
}

impl GstEngine {
    /// Initialise GStreamer. Safe to call more than once.
    pub fn new() -> EngineResult<Self> {
        gst::init().map_err(|e| EngineError::Init(e.to_string()))?;
        debug!(version = %gst::version_string(), "gstreamer initialised");
        Ok(Self { _private: () })
    }

    /// Factories from `factories` that are not installed.
    pub fn missing_factories<'a>(&self, factories: &[&'a str]) -> Vec<&'a str> {
        factories
            .iter()
            .copied()
            .filter(|name| gst::ElementFactory::find(name).is_none())
            .collect()
    }
}

impl Engine for GstEngine {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn new_session(&self, pipeline: &str) -> EngineResult<Box<dyn Session>> {
        let gst_pipeline = gst::Pipeline::with_name(pipeline);
        let bus = gst_pipeline.bus().ok_or(EngineError::BusClosed)?;
        Ok(Box::new(GstSession {
            name: pipeline.to_string(),
            pipeline: gst_pipeline,
            bus,
            released: false,
        }))
    }
}

struct GstSession {
    name: String,
    pipeline: gst::Pipeline,
    bus: gst::Bus,
    released: bool,
}

fn to_gst_state(state: EngineState) -> gst::State {
    match state {
        EngineState::Null => gst::State::Null,
        EngineState::Ready => gst::State::Ready,
        EngineState::Paused => gst::State::Paused,
        EngineState::Playing => gst::State::Playing,
    }
}

fn from_gst_state(state: gst::State) -> EngineState {
    match state {
        gst::State::Ready => EngineState::Ready,
        gst::State::Paused => EngineState::Paused,
        gst::State::Playing => EngineState::Playing,
        _ => EngineState::Null,
    }
}

fn to_value(value: &PropertyValue) -> glib::Value {
    match value {
        PropertyValue::Str(s) => s.to_value(),
        PropertyValue::Path(p) => p.to_string_lossy().into_owned().to_value(),
        PropertyValue::F32(v) => v.to_value(),
        PropertyValue::F64(v) => v.to_value(),
        PropertyValue::U64(v) => v.to_value(),
        PropertyValue::I32(v) => v.to_value(),
    }
}

/// Name of the pipeline child that contains `object`, so faults raised inside
/// bins (a decoder's parser, for instance) are attributed to the stage we
/// created.
fn stage_name(object: Option<&gst::Object>, pipeline: &gst::Pipeline) -> String {
    let Some(mut current) = object.cloned() else {
        return "unknown".to_string();
    };
    let top = pipeline.upcast_ref::<gst::Object>();
    while let Some(parent) = current.parent() {
        if &parent == top {
            break;
        }
        current = parent;
    }
    current.name().to_string()
}

impl GstSession {
    fn element(&self, name: &str) -> EngineResult<gst::Element> {
        self.pipeline
            .by_name(name)
            .ok_or_else(|| EngineError::NoSuchStage {
                name: name.to_string(),
            })
    }

    fn convert(&self, message: &gst::Message) -> BusMessage {
        use gst::MessageView;

        match message.view() {
            MessageView::Error(err) => BusMessage::Error {
                source: stage_name(message.src(), &self.pipeline),
                message: err.error().to_string(),
                debug: err.debug().map(|d| d.to_string()),
            },
            MessageView::Eos(_) => BusMessage::Eos,
            MessageView::StateChanged(change) => BusMessage::StateChanged {
                source: message
                    .src()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default(),
                old: from_gst_state(change.old()),
                current: from_gst_state(change.current()),
                pending: from_gst_state(change.pending()),
            },
            _ => BusMessage::Other {
                source: message.src().map(|s| s.name().to_string()),
                type_name: format!("{:?}", message.type_()),
            },
        }
    }
}

impl Session for GstSession {
    fn pipeline_name(&self) -> &str {
        &self.name
    }

    fn add_stage(&mut self, factory: &str, name: &str) -> EngineResult<()> {
        let element = gst::ElementFactory::make(factory)
            .name(name)
            .build()
            .map_err(|_| EngineError::UnknownFactory {
                factory: factory.to_string(),
            })?;
        self.pipeline
            .add(&element)
            .map_err(|e| EngineError::AddFailed {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    fn set_property(&mut self, stage: &str, key: &str, value: &PropertyValue) -> EngineResult<()> {
        let element = self.element(stage)?;
        let property_error = |message: String| EngineError::Property {
            stage: stage.to_string(),
            key: key.to_string(),
            message,
        };

        let pspec = element
            .find_property(key)
            .ok_or_else(|| property_error("no such property".to_string()))?;
        let value = to_value(value);
        // set_property_from_value aborts on a type mismatch.
        if !value.type_().is_a(pspec.value_type()) {
            return Err(property_error(format!(
                "expected {}, got {}",
                pspec.value_type(),
                value.type_()
            )));
        }
        element.set_property_from_value(key, &value);
        Ok(())
    }

    fn link(&mut self, upstream: &str, downstream: &str) -> EngineResult<()> {
        let up = self.element(upstream)?;
        let down = self.element(downstream)?;
        up.link(&down).map_err(|e| EngineError::LinkRefused {
            upstream: upstream.to_string(),
            downstream: downstream.to_string(),
            reason: e.to_string(),
        })
    }

    fn link_ports(&mut self, src: &PortRef, sink: &PortRef) -> EngineResult<()> {
        let up = self.element(&src.stage)?;
        let down = self.element(&sink.stage)?;
        up.link_pads(Some(src.port.as_str()), &down, Some(sink.port.as_str()))
            .map_err(|e| EngineError::LinkRefused {
                upstream: src.to_string(),
                downstream: sink.to_string(),
                reason: e.to_string(),
            })
    }

    fn compatible_port(&mut self, muxer: &str, src: &PortRef) -> EngineResult<PortRef> {
        let mux = self.element(muxer)?;
        let src_pad = self
            .element(&src.stage)?
            .static_pad(&src.port)
            .ok_or_else(|| EngineError::NoSuchPort {
                stage: src.stage.clone(),
                port: src.port.clone(),
            })?;
        let pad = mux
            .compatible_pad(&src_pad, None)
            .ok_or_else(|| EngineError::NoCompatiblePort {
                muxer: muxer.to_string(),
                port: src.to_string(),
            })?;
        Ok(PortRef::new(muxer, pad.name().as_str()))
    }

    fn on_stream_ready(&mut self, stage: &str, handler: StreamReadyHandler) -> EngineResult<()> {
        let element = self.element(stage)?;
        let pipeline = self.pipeline.downgrade();
        element.connect_pad_added(move |producer, pad| {
            let Some(pipeline) = pipeline.upgrade() else {
                return;
            };
            let port = GstStreamPort {
                producer: producer.name().to_string(),
                name: pad.name().to_string(),
                pad: pad.clone(),
                pipeline,
            };
            handler(&port);
        });
        Ok(())
    }

    fn set_state(&mut self, state: EngineState) -> EngineResult<StateChange> {
        match self.pipeline.set_state(to_gst_state(state)) {
            Ok(gst::StateChangeSuccess::Success) => Ok(StateChange::Success),
            Ok(gst::StateChangeSuccess::Async) => Ok(StateChange::Async),
            Ok(gst::StateChangeSuccess::NoPreroll) => Ok(StateChange::NoPreroll),
            Err(_) => Err(EngineError::StateChange { target: state }),
        }
    }

    fn next_message(&mut self) -> EngineResult<BusMessage> {
        let message = self
            .bus
            .timed_pop_filtered(
                gst::ClockTime::NONE,
                &[
                    gst::MessageType::Error,
                    gst::MessageType::Eos,
                    gst::MessageType::StateChanged,
                ],
            )
            .ok_or(EngineError::BusClosed)?;
        Ok(self.convert(&message))
    }

    fn stage_count(&self) -> usize {
        self.pipeline.children().len()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(pipeline = %self.name, error = %e, "failed to reset pipeline");
        }
        for child in self.pipeline.children() {
            if let Err(e) = self.pipeline.remove(&child) {
                warn!(pipeline = %self.name, stage = %child.name(), error = %e, "failed to remove stage");
            }
        }
        self.released = true;
    }
}

impl Drop for GstSession {
    fn drop(&mut self) {
        self.release();
    }
}

struct GstStreamPort {
    producer: String,
    name: String,
    pad: gst::Pad,
    pipeline: gst::Pipeline,
}

impl StreamPort for GstStreamPort {
    fn producer(&self) -> &str {
        &self.producer
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn negotiated_type(&self) -> Option<String> {
        let caps = self
            .pad
            .current_caps()
            .unwrap_or_else(|| self.pad.query_caps(None));
        caps.structure(0).map(|s| s.name().to_string())
    }

    fn is_target_linked(&self, target: &PortRef) -> bool {
        self.pipeline
            .by_name(&target.stage)
            .and_then(|element| element.static_pad(&target.port))
            .is_some_and(|pad| pad.is_linked())
    }

    fn link_to(&self, target: &PortRef) -> EngineResult<()> {
        let refused = |reason: String| EngineError::LinkRefused {
            upstream: format!("{}:{}", self.producer, self.name),
            downstream: target.to_string(),
            reason,
        };
        let sink = self
            .pipeline
            .by_name(&target.stage)
            .and_then(|element| element.static_pad(&target.port))
            .ok_or_else(|| refused("no such port".to_string()))?;
        self.pad
            .link(&sink)
            .map(|_| ())
            .map_err(|e| refused(format!("{e:?}")))
    }
}
