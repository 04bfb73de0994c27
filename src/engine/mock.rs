//! Scripted in-process engine for tests.
//!
//! Records every stage, property, link and state request in a shared
//! [`MockLedger`], and replays a scripted sequence of decoded streams and bus
//! messages from its own thread once the pipeline reaches `Playing`, the way a
//! real engine announces streams from a streaming thread.

use super::{
    BusMessage, Engine, EngineError, EngineResult, EngineState, PortRef, PropertyValue, Session,
    StateChange, StreamPort, StreamReadyHandler,
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Everything a mock session was asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    /// Stages currently alive, as `(name, factory)`.
    pub stages: Vec<(String, String)>,
    /// Stages created over the ledger's lifetime.
    pub stages_created: usize,
    pub properties: Vec<(String, String, PropertyValue)>,
    /// Every link made, including those of released sessions.
    pub links: Vec<(PortRef, PortRef)>,
    /// Requested states, in order.
    pub states: Vec<EngineState>,
    /// Stages with a stream-ready handler.
    pub stream_handlers: Vec<String>,
    pub sessions: usize,
    pub released: bool,
    /// Sink ports linked in the current session.
    live_sinks: Vec<PortRef>,
    requested_ports: usize,
}

impl MockLedger {
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.iter().any(|(n, _)| n == name)
    }

    /// Factory a stage was created from.
    pub fn factory_of(&self, name: &str) -> Option<&str> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.as_str())
    }

    /// Whether `sink` was ever linked.
    pub fn is_linked(&self, sink: &PortRef) -> bool {
        self.links.iter().any(|(_, s)| s == sink)
    }

    fn is_live(&self, sink: &PortRef) -> bool {
        self.live_sinks.contains(sink)
    }

    fn record_link(&mut self, src: PortRef, sink: PortRef) {
        self.live_sinks.push(sink.clone());
        self.links.push((src, sink));
    }

    /// Whether `upstream` feeds `downstream` through any ports.
    pub fn links_stages(&self, upstream: &str, downstream: &str) -> bool {
        self.links
            .iter()
            .any(|(src, sink)| src.stage == upstream && sink.stage == downstream)
    }

    pub fn property(&self, stage: &str, key: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .rev()
            .find(|(s, k, _)| s == stage && k == key)
            .map(|(_, _, v)| v)
    }
}

/// A stream the mock decoder announces once playing.
#[derive(Debug, Clone)]
pub struct MockStream {
    pub port: String,
    pub negotiated_type: Option<String>,
}

impl MockStream {
    pub fn new(port: &str, negotiated_type: &str) -> Self {
        Self {
            port: port.to_string(),
            negotiated_type: Some(negotiated_type.to_string()),
        }
    }

    /// A stream whose type has not been negotiated.
    pub fn untyped(port: &str) -> Self {
        Self {
            port: port.to_string(),
            negotiated_type: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MockScript {
    missing_factories: HashSet<String>,
    failing_links: HashSet<(String, String)>,
    failing_state: Option<EngineState>,
    no_compatible_port: bool,
    streams: Option<Vec<MockStream>>,
    messages: Option<Vec<BusMessage>>,
}

/// Scripted engine. Cheap to clone; clones share the ledger.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    script: MockScript,
    ledger: Arc<Mutex<MockLedger>>,
}

fn lock(ledger: &Mutex<MockLedger>) -> MutexGuard<'_, MockLedger> {
    ledger.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockEngine {
    /// Engine that knows every factory, links everything, announces one raw
    /// audio stream and then completes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `factory` unknown to the engine.
    pub fn without_factory(mut self, factory: &str) -> Self {
        self.script.missing_factories.insert(factory.to_string());
        self
    }

    /// Refuse any link from stage `upstream` to stage `downstream`.
    pub fn failing_link(mut self, upstream: &str, downstream: &str) -> Self {
        self.script
            .failing_links
            .insert((upstream.to_string(), downstream.to_string()));
        self
    }

    /// Fail the request to enter `state`.
    pub fn failing_state(mut self, state: EngineState) -> Self {
        self.script.failing_state = Some(state);
        self
    }

    /// Muxers report no compatible port.
    pub fn without_compatible_ports(mut self) -> Self {
        self.script.no_compatible_port = true;
        self
    }

    /// Streams announced by every stream-ready stage once playing.
    pub fn with_streams(mut self, streams: Vec<MockStream>) -> Self {
        self.script.streams = Some(streams);
        self
    }

    /// Bus messages delivered after the streams, replacing the default
    /// state-change + end-of-stream script.
    pub fn with_messages(mut self, messages: Vec<BusMessage>) -> Self {
        self.script.messages = Some(messages);
        self
    }

    /// Snapshot of the shared ledger.
    pub fn ledger(&self) -> MockLedger {
        lock(&self.ledger).clone()
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn new_session(&self, pipeline: &str) -> EngineResult<Box<dyn Session>> {
        let (bus_tx, bus_rx) = unbounded();
        {
            let mut ledger = lock(&self.ledger);
            ledger.sessions += 1;
            ledger.released = false;
        }
        Ok(Box::new(MockSession {
            name: pipeline.to_string(),
            script: self.script.clone(),
            ledger: self.ledger.clone(),
            handlers: Vec::new(),
            bus_tx: Some(bus_tx),
            bus_rx,
            driver: None,
        }))
    }
}

struct MockSession {
    name: String,
    script: MockScript,
    ledger: Arc<Mutex<MockLedger>>,
    handlers: Vec<(String, StreamReadyHandler)>,
    bus_tx: Option<Sender<BusMessage>>,
    bus_rx: Receiver<BusMessage>,
    driver: Option<JoinHandle<()>>,
}

fn state_message(source: &str, old: EngineState, current: EngineState) -> BusMessage {
    BusMessage::StateChanged {
        source: source.to_string(),
        old,
        current,
        pending: EngineState::Null,
    }
}

impl MockSession {
    fn require_stage(ledger: &MockLedger, name: &str) -> EngineResult<()> {
        if ledger.has_stage(name) {
            Ok(())
        } else {
            Err(EngineError::NoSuchStage {
                name: name.to_string(),
            })
        }
    }

    fn check_link(&self, ledger: &MockLedger, src: &PortRef, sink: &PortRef) -> EngineResult<()> {
        Self::require_stage(ledger, &src.stage)?;
        Self::require_stage(ledger, &sink.stage)?;
        if self
            .script
            .failing_links
            .contains(&(src.stage.clone(), sink.stage.clone()))
        {
            return Err(EngineError::LinkRefused {
                upstream: src.to_string(),
                downstream: sink.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        if ledger.is_live(sink) {
            return Err(EngineError::LinkRefused {
                upstream: src.to_string(),
                downstream: sink.to_string(),
                reason: "sink port already linked".to_string(),
            });
        }
        Ok(())
    }

    fn default_messages(&self) -> Vec<BusMessage> {
        vec![
            state_message(&self.name, EngineState::Ready, EngineState::Paused),
            state_message("mock_child", EngineState::Ready, EngineState::Paused),
            state_message(&self.name, EngineState::Paused, EngineState::Playing),
            BusMessage::Eos,
        ]
    }

    /// Replay streams and messages from a separate thread.
    fn start_driver(&mut self) {
        let Some(bus_tx) = self.bus_tx.take() else {
            return;
        };
        let streams = self
            .script
            .streams
            .clone()
            .unwrap_or_else(|| vec![MockStream::new("src_0", "audio/x-raw, format=F32LE")]);
        let messages = self
            .script
            .messages
            .clone()
            .unwrap_or_else(|| self.default_messages());
        let handlers = self.handlers.clone();
        let ledger = self.ledger.clone();
        let failing_links = self.script.failing_links.clone();

        self.driver = Some(thread::spawn(move || {
            for (producer, handler) in &handlers {
                for stream in &streams {
                    let port = MockStreamPort {
                        producer: producer.clone(),
                        stream: stream.clone(),
                        ledger: ledger.clone(),
                        failing_links: failing_links.clone(),
                    };
                    handler(&port);
                }
            }
            for message in messages {
                if bus_tx.send(message).is_err() {
                    break;
                }
            }
        }));
    }
}

impl Session for MockSession {
    fn pipeline_name(&self) -> &str {
        &self.name
    }

    fn add_stage(&mut self, factory: &str, name: &str) -> EngineResult<()> {
        if self.script.missing_factories.contains(factory) {
            return Err(EngineError::UnknownFactory {
                factory: factory.to_string(),
            });
        }
        let mut ledger = lock(&self.ledger);
        if ledger.has_stage(name) {
            return Err(EngineError::AddFailed {
                name: name.to_string(),
                message: "duplicate stage name".to_string(),
            });
        }
        ledger.stages.push((name.to_string(), factory.to_string()));
        ledger.stages_created += 1;
        Ok(())
    }

    fn set_property(&mut self, stage: &str, key: &str, value: &PropertyValue) -> EngineResult<()> {
        let mut ledger = lock(&self.ledger);
        Self::require_stage(&ledger, stage)?;
        ledger
            .properties
            .push((stage.to_string(), key.to_string(), value.clone()));
        Ok(())
    }

    fn link(&mut self, upstream: &str, downstream: &str) -> EngineResult<()> {
        self.link_ports(&PortRef::src(upstream), &PortRef::sink(downstream))
    }

    fn link_ports(&mut self, src: &PortRef, sink: &PortRef) -> EngineResult<()> {
        let mut ledger = lock(&self.ledger);
        self.check_link(&ledger, src, sink)?;
        ledger.record_link(src.clone(), sink.clone());
        Ok(())
    }

    fn compatible_port(&mut self, muxer: &str, src: &PortRef) -> EngineResult<PortRef> {
        let mut ledger = lock(&self.ledger);
        Self::require_stage(&ledger, muxer)?;
        if self.script.no_compatible_port {
            return Err(EngineError::NoCompatiblePort {
                muxer: muxer.to_string(),
                port: src.to_string(),
            });
        }
        let port = PortRef::new(muxer, format!("sink_{}", ledger.requested_ports));
        ledger.requested_ports += 1;
        Ok(port)
    }

    fn on_stream_ready(&mut self, stage: &str, handler: StreamReadyHandler) -> EngineResult<()> {
        let mut ledger = lock(&self.ledger);
        Self::require_stage(&ledger, stage)?;
        ledger.stream_handlers.push(stage.to_string());
        drop(ledger);
        self.handlers.push((stage.to_string(), handler));
        Ok(())
    }

    fn set_state(&mut self, state: EngineState) -> EngineResult<StateChange> {
        lock(&self.ledger).states.push(state);
        if self.script.failing_state == Some(state) {
            return Err(EngineError::StateChange { target: state });
        }
        if state == EngineState::Playing {
            self.start_driver();
            return Ok(StateChange::Async);
        }
        Ok(StateChange::Success)
    }

    fn next_message(&mut self) -> EngineResult<BusMessage> {
        self.bus_rx.recv().map_err(|_| EngineError::BusClosed)
    }

    fn stage_count(&self) -> usize {
        lock(&self.ledger).stages.len()
    }

    fn release(&mut self) {
        if let Some(driver) = self.driver.take()
            && driver.join().is_err()
        {
            tracing::warn!(pipeline = %self.name, "mock driver thread panicked");
        }
        self.handlers.clear();
        self.bus_tx = None;
        let mut ledger = lock(&self.ledger);
        ledger.stages.clear();
        ledger.live_sinks.clear();
        ledger.released = true;
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.release();
    }
}

struct MockStreamPort {
    producer: String,
    stream: MockStream,
    ledger: Arc<Mutex<MockLedger>>,
    failing_links: HashSet<(String, String)>,
}

impl StreamPort for MockStreamPort {
    fn producer(&self) -> &str {
        &self.producer
    }

    fn name(&self) -> &str {
        &self.stream.port
    }

    fn negotiated_type(&self) -> Option<String> {
        self.stream.negotiated_type.clone()
    }

    fn is_target_linked(&self, target: &PortRef) -> bool {
        lock(&self.ledger).is_live(target)
    }

    fn link_to(&self, target: &PortRef) -> EngineResult<()> {
        let src = PortRef::new(self.producer.clone(), self.stream.port.clone());
        let mut ledger = lock(&self.ledger);
        MockSession::require_stage(&ledger, &target.stage)?;
        if self
            .failing_links
            .contains(&(self.producer.clone(), target.stage.clone()))
            || ledger.is_live(target)
        {
            return Err(EngineError::LinkRefused {
                upstream: src.to_string(),
                downstream: target.to_string(),
                reason: "refused by engine".to_string(),
            });
        }
        ledger.record_link(src, target.clone());
        Ok(())
    }
}
