//! Handler contract for node execution.
//!
//! A [`NodeHandler`] implements the behavior of one node type. Handlers are
//! registered by type string in a
//! [`HandlerRegistry`](crate::registry::HandlerRegistry) and invoked by the
//! scheduler once per node per run.
//!
//! # Contract
//!
//! [`NodeHandler::execute`] returns a plain `String` and never an error.
//! Domain-level failures (bad configuration, upstream service faults) are
//! reported by returning a descriptive message, which downstream nodes then
//! consume like any other output. The run itself only fails on structural
//! problems detected by the engine, never inside a handler.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::event_bus::Event;
use crate::workflow::Node;

/// Inputs handed to a handler for a single node execution.
///
/// `inputs` carries parent outputs in the order the node's incoming edges
/// were declared, with one entry per edge (a parent connected twice appears
/// twice). `side_channel` carries outputs routed by type pairing rather than
/// by edge position, keyed by the destination field name.
#[derive(Clone, Debug, Default)]
pub struct ExecutionFrame {
    pub inputs: Vec<String>,
    pub side_channel: FxHashMap<String, String>,
}

impl ExecutionFrame {
    #[must_use]
    pub fn new(inputs: Vec<String>, side_channel: FxHashMap<String, String>) -> Self {
        Self {
            inputs,
            side_channel,
        }
    }
}

/// Per-invocation context passed to handlers alongside the frame.
///
/// Lets handlers emit progress events to the run's event bus without
/// holding a reference to the bus itself.
#[derive(Clone, Debug)]
pub struct HandlerContext {
    pub node_id: String,
    pub run_id: String,
    event_sender: flume::Sender<Event>,
}

impl HandlerContext {
    #[must_use]
    pub fn new(node_id: String, run_id: String, event_sender: flume::Sender<Event>) -> Self {
        Self {
            node_id,
            run_id,
            event_sender,
        }
    }

    /// Emit a scoped progress event attributed to this node.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), HandlerContextError> {
        self.event_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.run_id.clone(),
                scope.into(),
                message.into(),
            ))
            .map_err(|_| HandlerContextError::ChannelClosed {
                node_id: self.node_id.clone(),
            })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum HandlerContextError {
    #[error("event channel closed while node '{node_id}' was emitting")]
    #[diagnostic(
        code(vortexflow::handler::channel_closed),
        help("the event bus listener was stopped before the run finished")
    )]
    ChannelClosed { node_id: String },
}

/// Behavior of one node type.
///
/// Implementations must be `Send + Sync`; the scheduler may invoke handlers
/// for independent nodes concurrently.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Execute this node with its assembled inputs and return its output.
    ///
    /// Must not panic. Failures are reported as descriptive output strings.
    async fn execute(&self, node: &Node, frame: ExecutionFrame, ctx: HandlerContext) -> String;
}
