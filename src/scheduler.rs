//! Concurrent node resolution.
//!
//! [`Scheduler::resolve`] drives one node to completion: it claims the node
//! in the shared [`RunState`], launches any unlaunched parents as concurrent
//! tasks, waits for every parent to finish, assembles the node's
//! [`ExecutionFrame`] from parent outputs, invokes the registered handler,
//! records the memoized output, and optionally cascades into the node's
//! children.
//!
//! # Cycle detection
//!
//! Two complementary checks keep cyclic graphs from hanging a run. Each
//! resolve call carries the `ancestry` of node ids on its own call chain;
//! launching a parent that is already an ancestor is a cycle. Independently,
//! before blocking on a parent claimed by a sibling branch, the scheduler
//! checks whether that parent is downstream of the current node; if so the
//! wait could never be satisfied and the run fails with the same error.
//! Together they guarantee the wait graph stays acyclic.
//!
//! # Cancellation
//!
//! Child tasks are spawned into a [`JoinSet`]. On the first failed task the
//! set is shut down, which aborts its siblings; aborted tasks drop their own
//! nested sets, so cancellation propagates through the whole resolve tree.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::event_bus::Event;
use crate::handler::{ExecutionFrame, HandlerContext};
use crate::registry::HandlerRegistry;
use crate::routing::RoutingTable;
use crate::state::{BeginOutcome, RunState};
use crate::workflow::Workflow;

/// Fatal resolution failures. Handler-level faults never surface here;
/// handlers report them inside their output strings.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    #[error("circular dependency detected at node `{node}`")]
    #[diagnostic(
        code(vortexflow::scheduler::circular_dependency),
        help("Remove the edge that closes the cycle; workflows must be acyclic.")
    )]
    CircularDependency { node: String },

    #[error("no handler registered for node `{node}` of type `{node_type}`")]
    #[diagnostic(
        code(vortexflow::scheduler::unknown_node_type),
        help("Register a handler for this type before starting the run.")
    )]
    UnknownNodeType { node: String, node_type: String },

    #[error("node `{node}` is referenced but not present in the workflow")]
    #[diagnostic(code(vortexflow::scheduler::missing_node))]
    MissingNode { node: String },

    #[error("completion signal for node `{node}` was lost")]
    #[diagnostic(code(vortexflow::scheduler::completion_lost))]
    CompletionLost { node: String },

    #[error("task resolving a dependency of node `{node}` failed to join")]
    #[diagnostic(code(vortexflow::scheduler::join))]
    Join {
        node: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Per-run resolution engine.
///
/// Every field is a cheap handle, so the scheduler is cloned into each
/// spawned task; all clones share the run's [`RunState`].
#[derive(Clone)]
pub struct Scheduler {
    workflow: Arc<Workflow>,
    registry: Arc<HandlerRegistry>,
    routing: RoutingTable,
    state: RunState,
    run_id: String,
    events: flume::Sender<Event>,
}

impl Scheduler {
    pub fn new(
        workflow: Arc<Workflow>,
        registry: Arc<HandlerRegistry>,
        routing: RoutingTable,
        run_id: String,
        events: flume::Sender<Event>,
    ) -> Self {
        Self {
            workflow,
            registry,
            routing,
            state: RunState::new(),
            run_id,
            events,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    fn emit(&self, node_id: &str, scope: &str, message: String) {
        // Best effort; a stopped listener must not fail the run.
        let _ = self.events.send(Event::node_message_with_meta(
            node_id.to_string(),
            self.run_id.clone(),
            scope.to_string(),
            message,
        ));
    }

    /// Resolve `node_id` and return its output.
    ///
    /// `ancestry` holds the node ids already executing on this call chain,
    /// oldest first. `cascade` makes the node launch its children after
    /// finishing; parent launches never cascade, driver launches do.
    pub fn resolve(
        &self,
        node_id: String,
        cascade: bool,
        ancestry: Vec<String>,
    ) -> BoxFuture<'static, Result<String, SchedulerError>> {
        let this = self.clone();
        Box::pin(async move { this.resolve_inner(node_id, cascade, ancestry).await })
    }

    #[instrument(skip(self, ancestry), fields(run_id = %self.run_id))]
    async fn resolve_inner(
        &self,
        node_id: String,
        cascade: bool,
        ancestry: Vec<String>,
    ) -> Result<String, SchedulerError> {
        match self.state.begin(&node_id) {
            BeginOutcome::Cached(output) => {
                debug!(node = %node_id, "returning memoized output");
                return Ok(output);
            }
            BeginOutcome::Cycle => {
                return Err(SchedulerError::CircularDependency {
                    node: node_id.clone(),
                });
            }
            BeginOutcome::Started => {}
        }

        let output = match self.execute_node(&node_id, &ancestry).await {
            Ok(output) => output,
            Err(err) => {
                self.state.abandon(&node_id);
                return Err(err);
            }
        };

        self.state.finish(&node_id, output.clone());
        self.emit(
            &node_id,
            "node:complete",
            format!("node `{node_id}` completed"),
        );

        if cascade {
            self.launch_children(&node_id).await?;
        }
        Ok(output)
    }

    async fn execute_node(
        &self,
        node_id: &str,
        ancestry: &[String],
    ) -> Result<String, SchedulerError> {
        let node = self
            .workflow
            .node(node_id)
            .ok_or_else(|| SchedulerError::MissingNode {
                node: node_id.to_string(),
            })?
            .clone();

        let handler =
            self.registry
                .get(&node.node_type)
                .ok_or_else(|| SchedulerError::UnknownNodeType {
                    node: node_id.to_string(),
                    node_type: node.node_type.to_string(),
                })?;

        self.await_parents(node_id, ancestry).await?;

        self.emit(
            node_id,
            "node:start",
            format!("executing `{node_id}` ({})", node.node_type),
        );

        let frame = self.assemble_frame(&node);
        let ctx = HandlerContext::new(
            node_id.to_string(),
            self.run_id.clone(),
            self.events.clone(),
        );
        Ok(handler.execute(&node, frame, ctx).await)
    }

    /// Launch unlaunched parents concurrently, then wait until every parent
    /// has finished, including parents claimed by sibling branches.
    async fn await_parents(&self, node_id: &str, ancestry: &[String]) -> Result<(), SchedulerError> {
        let parents: Vec<String> = self
            .workflow
            .incomers(node_id)
            .into_iter()
            .map(str::to_string)
            .collect();
        if parents.is_empty() {
            return Ok(());
        }

        let mut chain: Vec<String> = ancestry.to_vec();
        chain.push(node_id.to_string());

        let mut tasks: JoinSet<Result<String, SchedulerError>> = JoinSet::new();
        for parent in &parents {
            if chain.contains(parent) {
                tasks.shutdown().await;
                return Err(SchedulerError::CircularDependency {
                    node: parent.clone(),
                });
            }
            if self.state.try_schedule(parent) {
                tasks.spawn(self.resolve(parent.clone(), false, chain.clone()));
            } else if !self.state.is_executed(parent) && self.workflow.reaches(node_id, parent) {
                // The parent is downstream of this node, so waiting for it
                // can never succeed.
                tasks.shutdown().await;
                return Err(SchedulerError::CircularDependency {
                    node: parent.clone(),
                });
            }
        }
        join_all(&mut tasks, node_id).await?;

        // Parents launched by sibling branches finish on their own tasks;
        // block until each one has signalled completion.
        for parent in &parents {
            let mut done = self.state.completion(parent);
            done.wait_for(|finished| *finished)
                .await
                .map_err(|_| SchedulerError::CompletionLost {
                    node: parent.clone(),
                })?;
        }
        Ok(())
    }

    /// Launch every unlaunched child of `node_id`, cascading further.
    /// Children start a fresh ancestry chain of their own.
    async fn launch_children(&self, node_id: &str) -> Result<(), SchedulerError> {
        let children: Vec<String> = self
            .workflow
            .outgoers(node_id)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut tasks: JoinSet<Result<String, SchedulerError>> = JoinSet::new();
        for child in children {
            if self.state.try_schedule(&child) {
                tasks.spawn(self.resolve(child, true, Vec::new()));
            }
        }
        join_all(&mut tasks, node_id).await
    }

    /// Walk the node's incoming edges in declaration order and place each
    /// parent output either positionally or, when a side channel rule
    /// matches the producer/consumer type pair, into the named field (last
    /// matching edge wins). A parent output missing from the memo is
    /// skipped rather than treated as fatal; the completion barrier makes
    /// that unreachable in practice.
    fn assemble_frame(&self, node: &crate::workflow::Node) -> ExecutionFrame {
        let mut frame = ExecutionFrame::default();
        for edge in self.workflow.incoming_edges(&node.id) {
            let Some(output) = self.state.output(&edge.source) else {
                debug!(parent = %edge.source, node = %node.id, "no memoized output for parent, skipping input");
                continue;
            };
            let producer_type = self.workflow.node(&edge.source).map(|p| &p.node_type);
            let field = producer_type.and_then(|pt| self.routing.route(pt, &node.node_type));
            match field {
                Some(field) => {
                    frame.side_channel.insert(field.to_string(), output);
                }
                None => frame.inputs.push(output),
            }
        }
        frame
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("run_id", &self.run_id)
            .field("nodes", &self.workflow.nodes.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Drain a join set, surfacing the first failure and aborting the rest.
async fn join_all(
    tasks: &mut JoinSet<Result<String, SchedulerError>>,
    node_id: &str,
) -> Result<(), SchedulerError> {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                tasks.shutdown().await;
                return Err(err);
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                tasks.shutdown().await;
                return Err(SchedulerError::Join {
                    node: node_id.to_string(),
                    source: join_err,
                });
            }
        }
    }
    Ok(())
}
