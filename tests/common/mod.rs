//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use vortexflow::event_bus::EventBusConfig;
use vortexflow::handler::{ExecutionFrame, HandlerContext, NodeHandler};
use vortexflow::registry::HandlerRegistry;
use vortexflow::runner::{RunConfig, Runner};
use vortexflow::workflow::{Edge, Node, Workflow};

/// Execution log shared between recording handlers and assertions.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, node_id: &str) {
        self.entries.lock().push(node_id.to_string());
    }

    pub fn order(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Position of `node_id` in the execution order.
    pub fn index_of(&self, node_id: &str) -> Option<usize> {
        self.entries.lock().iter().position(|id| id == node_id)
    }

    pub fn count_of(&self, node_id: &str) -> usize {
        self.entries.lock().iter().filter(|id| *id == node_id).count()
    }
}

/// Records its node id, then echoes every positional input joined by `|`,
/// prefixed with the node's own id.
pub struct RecordingHandler {
    recorder: Recorder,
    delay: Option<Duration>,
}

impl RecordingHandler {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            delay: None,
        }
    }

    pub fn with_delay(recorder: Recorder, delay: Duration) -> Self {
        Self {
            recorder,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl NodeHandler for RecordingHandler {
    async fn execute(&self, node: &Node, frame: ExecutionFrame, _ctx: HandlerContext) -> String {
        self.recorder.record(&node.id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if frame.inputs.is_empty() {
            node.id.clone()
        } else {
            format!("{}({})", node.id, frame.inputs.join("|"))
        }
    }
}

/// Concatenates the positional inputs verbatim.
pub struct EchoHandler;

#[async_trait]
impl NodeHandler for EchoHandler {
    async fn execute(&self, _: &Node, frame: ExecutionFrame, _: HandlerContext) -> String {
        frame.inputs.concat()
    }
}

/// Returns a fixed string regardless of inputs.
pub struct StaticHandler(pub &'static str);

#[async_trait]
impl NodeHandler for StaticHandler {
    async fn execute(&self, _: &Node, _: ExecutionFrame, _: HandlerContext) -> String {
        self.0.to_string()
    }
}

/// Panics on execution, violating the handler contract on purpose.
pub struct PanickingHandler;

#[async_trait]
impl NodeHandler for PanickingHandler {
    async fn execute(&self, node: &Node, _: ExecutionFrame, _: HandlerContext) -> String {
        panic!("handler for `{}` blew up", node.id);
    }
}

/// Serializes the whole frame so tests can assert on side channel routing.
pub struct FrameDumpHandler;

#[async_trait]
impl NodeHandler for FrameDumpHandler {
    async fn execute(&self, _: &Node, frame: ExecutionFrame, _: HandlerContext) -> String {
        let mut channels: Vec<String> = frame
            .side_channel
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect();
        channels.sort();
        format!(
            "inputs=[{}] side=[{}]",
            frame.inputs.join(","),
            channels.join(",")
        )
    }
}

/// Build a workflow from `(id, type)` node pairs and `(source, target)`
/// edge pairs.
pub fn wf(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> Workflow {
    Workflow::new(
        nodes.iter().map(|(id, ty)| Node::new(*id, *ty)).collect(),
        edges.iter().map(|(s, t)| Edge::new(*s, *t)).collect(),
    )
}

/// Runner with no event sinks attached, for quiet test output.
pub fn silent_runner(registry: HandlerRegistry) -> Runner {
    Runner::with_config(
        Arc::new(registry),
        RunConfig {
            event_bus: EventBusConfig::silent(),
            ..RunConfig::default()
        },
    )
}

/// Registry where every listed type records into `recorder`.
pub fn recording_registry(recorder: &Recorder, types: &[&str]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for ty in types {
        registry = registry.register(*ty, Arc::new(RecordingHandler::new(recorder.clone())));
    }
    registry
}
