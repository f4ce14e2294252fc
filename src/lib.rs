//! # Vortexflow: Dependency-driven Concurrent Workflow Engine
//!
//! Vortexflow executes a directed graph of typed work items ("nodes") whose
//! dependency edges determine execution order. Each node's handler runs only
//! after every direct predecessor has produced its textual output, and those
//! outputs are routed into the node's input frame. Independent branches run
//! concurrently on the tokio runtime.
//!
//! ## Core Concepts
//!
//! - **Workflow**: the static `(nodes, edges)` pair submitted for one run
//! - **Handlers**: per-type async capabilities that turn a node into a string
//! - **Run State**: shared `scheduled`/`executing`/`executed` bookkeeping with
//!   a memoized output map, guarded by a single mutex
//! - **Scheduler**: recursive concurrent resolution with barrier waits,
//!   memoization, and on-chain cycle detection
//! - **Runner**: the two-phase top-level driver that returns the full
//!   per-node results map
//!
//! ## Quick Start
//!
//! ```no_run
//! use vortexflow::handler::{ExecutionFrame, HandlerContext, NodeHandler};
//! use vortexflow::registry::HandlerRegistry;
//! use vortexflow::runner::Runner;
//! use vortexflow::workflow::{Edge, Node, Workflow};
//! use async_trait::async_trait;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl NodeHandler for Greeter {
//!     async fn execute(&self, _: &Node, _: ExecutionFrame, _: HandlerContext) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl NodeHandler for Echo {
//!     async fn execute(&self, _: &Node, frame: ExecutionFrame, _: HandlerContext) -> String {
//!         frame.inputs.concat()
//!     }
//! }
//!
//! # async fn example() -> miette::Result<()> {
//! # use std::sync::Arc;
//! let registry = HandlerRegistry::new()
//!     .register("greet", Arc::new(Greeter))
//!     .register("echo", Arc::new(Echo));
//!
//! let workflow = Workflow::new(
//!     vec![Node::new("s", "greet"), Node::new("a", "echo")],
//!     vec![Edge::new("s", "a")],
//! );
//!
//! let report = Runner::new(Arc::new(registry)).run(workflow).await?;
//! assert_eq!(report.results["a"], "hello");
//! # Ok(())
//! # }
//! ```
//!
//! ## Handler Contract
//!
//! Handlers never fail across the engine boundary: [`NodeHandler::execute`]
//! returns a plain `String`, so any internal fault must be encoded as
//! diagnostic text in the output. Downstream nodes receive that text as
//! ordinary input. Structural faults (cycles, unknown node types, no start
//! nodes) abort the whole run instead.
//!
//! [`NodeHandler::execute`]: handler::NodeHandler::execute
//!
//! ## Module Guide
//!
//! - [`workflow`] - Wire types and pure topology queries
//! - [`handler`] - The `NodeHandler` trait, execution frames, emit context
//! - [`registry`] - Injected type-to-handler capability map
//! - [`routing`] - Declarative side-channel routing table
//! - [`state`] - Per-run shared visitation state and output memo
//! - [`scheduler`] - Recursive concurrent resolution with barriers
//! - [`runner`] - Two-phase run driver and final results map
//! - [`handlers`] - Built-in handlers for the stock node types
//! - [`event_bus`] - Structured lifecycle events with pluggable sinks

pub mod event_bus;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod routing;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod workflow;
