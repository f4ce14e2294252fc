//! Two-phase run driver.
//!
//! A [`Runner`] owns a handler registry and turns a submitted [`Workflow`]
//! into a [`RunReport`]. Each run validates the graph, spins up an event
//! bus, then drives resolution in two phases. Phase one resolves every
//! start node without cascading, so all entry points finish before anything
//! downstream begins. Phase two launches the children of the start nodes
//! with cascading enabled, which walks the rest of the graph concurrently.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::event_bus::{Event, EventBusConfig, RUN_COMPLETE_SCOPE, RUN_START_SCOPE};
use crate::registry::HandlerRegistry;
use crate::routing::RoutingTable;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::workflow::{Workflow, WorkflowError};

/// Fatal run failures. These abort the whole run; handler-level faults are
/// reported inside node outputs and never surface here.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("workflow has no start nodes")]
    #[diagnostic(
        code(vortexflow::runner::no_start_nodes),
        help(
            "At least one node must have no incoming edges. A non-empty \
             workflow where every node has a parent is entirely cyclic."
        )
    )]
    NoStartNodes,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("a run task failed to join")]
    #[diagnostic(code(vortexflow::runner::join))]
    Join(#[from] tokio::task::JoinError),
}

/// Per-run options.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// Run identifier; a v4 UUID is generated when absent.
    pub run_id: Option<String>,
    /// Side channel routing rules consulted during frame assembly.
    pub routing: RoutingTable,
    /// Event sinks attached to the run's bus.
    pub event_bus: EventBusConfig,
}

/// Outcome of a completed run: one output per executed node.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub results: FxHashMap<String, String>,
}

impl RunReport {
    /// Output of a single node, if it executed.
    #[must_use]
    pub fn output(&self, node_id: &str) -> Option<&str> {
        self.results.get(node_id).map(String::as_str)
    }
}

/// Entry point for executing workflows against a fixed handler registry.
///
/// ```
/// use std::sync::Arc;
/// use vortexflow::event_bus::EventBusConfig;
/// use vortexflow::handlers::CombineTextHandler;
/// use vortexflow::registry::HandlerRegistry;
/// use vortexflow::runner::{RunConfig, Runner};
/// use vortexflow::workflow::{Edge, Node, Workflow};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), vortexflow::runner::RunnerError> {
/// let registry = HandlerRegistry::new()
///     .register("combineText", Arc::new(CombineTextHandler));
/// let runner = Runner::with_config(
///     Arc::new(registry),
///     RunConfig {
///         event_bus: EventBusConfig::silent(),
///         ..RunConfig::default()
///     },
/// );
/// let report = runner
///     .run(Workflow::new(vec![Node::new("only", "combineText")], vec![]))
///     .await?;
/// assert!(report.output("only").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Runner {
    registry: Arc<HandlerRegistry>,
    config: RunConfig,
}

impl Runner {
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, RunConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: Arc<HandlerRegistry>, config: RunConfig) -> Self {
        Self { registry, config }
    }

    /// Execute `workflow` to completion and collect every node output.
    #[instrument(skip(self, workflow), fields(nodes = workflow.nodes.len()))]
    pub async fn run(&self, workflow: Workflow) -> Result<RunReport, RunnerError> {
        workflow.validate()?;

        let starts: Vec<String> = workflow
            .start_nodes()
            .iter()
            .map(|n| n.id.clone())
            .collect();
        if starts.is_empty() {
            error!("rejecting workflow without start nodes");
            return Err(RunnerError::NoStartNodes);
        }

        let run_id = self
            .config
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!(%run_id, starts = starts.len(), "starting run");

        let bus = self.config.event_bus.build_event_bus();
        bus.listen_for_events();
        let sender = bus.get_sender();
        let _ = sender.send(Event::diagnostic(
            RUN_START_SCOPE,
            format!("run `{run_id}` started ({} start nodes)", starts.len()),
        ));

        let scheduler = Scheduler::new(
            Arc::new(workflow),
            Arc::clone(&self.registry),
            self.config.routing.clone(),
            run_id.clone(),
            sender.clone(),
        );

        let outcome = drive(&scheduler, &starts).await;
        match &outcome {
            Ok(()) => {
                let _ = sender.send(Event::diagnostic(
                    RUN_COMPLETE_SCOPE,
                    format!("run `{run_id}` completed"),
                ));
            }
            Err(err) => {
                error!(%run_id, %err, "run failed");
                let _ = sender.send(Event::diagnostic(
                    RUN_COMPLETE_SCOPE,
                    format!("run `{run_id}` failed: {err}"),
                ));
            }
        }
        bus.stop_listener().await;
        outcome?;

        Ok(RunReport {
            run_id,
            results: scheduler.state().results(),
        })
    }
}

/// Phase one resolves the start nodes themselves; phase two launches their
/// children with cascading enabled. A final sweep catches reachable nodes
/// the cascade missed: a parent claimed by a dependent's barrier never
/// cascades, so its remaining children need a top-level launch of their
/// own.
async fn drive(scheduler: &Scheduler, starts: &[String]) -> Result<(), RunnerError> {
    let mut tasks: JoinSet<Result<String, SchedulerError>> = JoinSet::new();
    for start in starts {
        if scheduler.state().try_schedule(start) {
            tasks.spawn(scheduler.resolve(start.clone(), false, Vec::new()));
        }
    }
    drain(&mut tasks).await?;

    let mut seen = FxHashSet::default();
    let frontier: Vec<String> = starts
        .iter()
        .flat_map(|start| scheduler.workflow().outgoers(start))
        .filter(|child| seen.insert(child.to_string()))
        .map(str::to_string)
        .collect();

    let mut tasks: JoinSet<Result<String, SchedulerError>> = JoinSet::new();
    for child in frontier {
        if scheduler.state().try_schedule(&child) {
            tasks.spawn(scheduler.resolve(child, true, Vec::new()));
        }
    }
    drain(&mut tasks).await?;

    let reachable = reachable_from(scheduler.workflow(), starts);
    loop {
        let mut tasks: JoinSet<Result<String, SchedulerError>> = JoinSet::new();
        let mut launched = false;
        for node in &reachable {
            if scheduler.state().try_schedule(node) {
                launched = true;
                tasks.spawn(scheduler.resolve(node.clone(), true, Vec::new()));
            }
        }
        if !launched {
            return Ok(());
        }
        drain(&mut tasks).await?;
    }
}

/// Node ids reachable from the start set, in breadth-first discovery order.
fn reachable_from(workflow: &Workflow, starts: &[String]) -> Vec<String> {
    let mut seen: FxHashSet<&str> = starts.iter().map(String::as_str).collect();
    let mut order: Vec<String> = starts.to_vec();
    let mut cursor = 0;
    while cursor < order.len() {
        let current = order[cursor].clone();
        cursor += 1;
        for child in workflow.outgoers(&current) {
            if seen.insert(child) {
                order.push(child.to_string());
            }
        }
    }
    order
}

/// Surface the first task failure and abort the remaining tasks.
async fn drain(tasks: &mut JoinSet<Result<String, SchedulerError>>) -> Result<(), RunnerError> {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                tasks.shutdown().await;
                return Err(err.into());
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                tasks.shutdown().await;
                return Err(join_err.into());
            }
        }
    }
    Ok(())
}
