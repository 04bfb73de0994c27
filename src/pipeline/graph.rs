//! The per-request pipeline: owner of every stage and edge.

use crate::engine::{Engine, PortRef, Session};
use crate::error::{NightcoreError, Result};
use crate::pipeline::binder::DeferredEdge;
use crate::pipeline::lifecycle::LifecycleState;
use crate::pipeline::stage::{StageConfig, StageKind, StageNode};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Linked while the graph is built.
    Static,
    /// Completed by the pad binder once the producer's stream type is known.
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub src: PortRef,
    pub sink: PortRef,
    pub kind: EdgeKind,
}

/// Stages, edges and lifecycle state of one request.
///
/// Never shared or reused. Dropping it returns the engine to its idle state
/// and releases every stage, whichever way the request ended.
pub struct Pipeline {
    pub(crate) session: Box<dyn Session>,
    nodes: Vec<StageNode>,
    edges: Vec<Edge>,
    deferred: Vec<Arc<DeferredEdge>>,
    pub(crate) state: LifecycleState,
}

impl Pipeline {
    /// Open an empty pipeline on `engine`.
    pub fn new(engine: &dyn Engine, name: &str) -> Result<Self> {
        let session =
            engine
                .new_session(name)
                .map_err(|e| NightcoreError::CannotCreateElements {
                    stage: name.to_string(),
                    factory: "pipeline".to_string(),
                    message: e.to_string(),
                })?;
        debug!(pipeline = name, engine = engine.name(), "pipeline created");
        Ok(Self {
            session,
            nodes: Vec::new(),
            edges: Vec::new(),
            deferred: Vec::new(),
            state: LifecycleState::Idle,
        })
    }

    pub fn name(&self) -> &str {
        self.session.pipeline_name()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn deferred_edges(&self) -> &[Arc<DeferredEdge>] {
        &self.deferred
    }

    pub fn node(&self, name: &str) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Kind of the stage called `name`, if this pipeline created it.
    pub fn kind_of(&self, name: &str) -> Option<StageKind> {
        self.node(name).map(StageNode::kind)
    }

    /// Stages the engine currently holds for this pipeline.
    pub fn stage_count(&self) -> usize {
        self.session.stage_count()
    }

    /// Instantiate a stage and apply its properties.
    pub fn add_stage(&mut self, name: &str, config: StageConfig) -> Result<()> {
        let factory = config.factory();
        let create_error = |message: String| NightcoreError::CannotCreateElements {
            stage: name.to_string(),
            factory: factory.to_string(),
            message,
        };

        self.session
            .add_stage(factory, name)
            .map_err(|e| create_error(e.to_string()))?;
        for (key, value) in config.properties() {
            self.session
                .set_property(name, &key, &value)
                .map_err(|e| create_error(e.to_string()))?;
        }

        debug!(stage = name, factory, kind = %config.kind(), "stage created");
        self.nodes.push(StageNode {
            name: name.to_string(),
            config,
        });
        Ok(())
    }

    /// Statically link two stages through their default ports.
    pub fn link(&mut self, upstream: &str, downstream: &str) -> Result<()> {
        self.session
            .link(upstream, downstream)
            .map_err(|e| NightcoreError::CannotLinkElements {
                upstream: upstream.to_string(),
                downstream: downstream.to_string(),
                message: e.to_string(),
            })?;
        debug!(upstream, downstream, "linked");
        self.edges.push(Edge {
            src: PortRef::src(upstream),
            sink: PortRef::sink(downstream),
            kind: EdgeKind::Static,
        });
        Ok(())
    }

    /// Link every adjacent pair of `stages`, in order.
    pub fn link_chain(&mut self, stages: &[&str]) -> Result<()> {
        for pair in stages.windows(2) {
            self.link(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Statically link two explicit ports.
    pub fn link_ports(&mut self, src: &PortRef, sink: &PortRef) -> Result<()> {
        self.session
            .link_ports(src, sink)
            .map_err(|e| NightcoreError::CannotLinkElements {
                upstream: src.to_string(),
                downstream: sink.to_string(),
                message: e.to_string(),
            })?;
        self.edges.push(Edge {
            src: src.clone(),
            sink: sink.clone(),
            kind: EdgeKind::Static,
        });
        Ok(())
    }

    /// Plan the edge `producer -> target` and hand its completion to the pad
    /// binder.
    pub fn defer_link(&mut self, producer: &str, target: PortRef) -> Result<Arc<DeferredEdge>> {
        let edge = Arc::new(DeferredEdge::new(producer, target.clone()));
        self.session
            .on_stream_ready(producer, edge.handler())
            .map_err(|e| NightcoreError::CannotLinkElements {
                upstream: producer.to_string(),
                downstream: target.to_string(),
                message: e.to_string(),
            })?;
        debug!(producer, target = %target, "deferred link registered");
        self.edges.push(Edge {
            src: PortRef::new(producer, "<pending>"),
            sink: target,
            kind: EdgeKind::Deferred,
        });
        self.deferred.push(edge.clone());
        Ok(edge)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
