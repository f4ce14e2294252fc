//! Workflow wire types and pure topology queries.
//!
//! A [`Workflow`] is the static `(nodes, edges)` pair submitted for one run.
//! The engine never mutates it; all queries here are side-effect free scans
//! over the node and edge lists. The serde shape matches the run input of
//! the HTTP boundary: `{ nodes: [{id, type, config}], edges: [{source,
//! target}] }`.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::NodeType;

/// A unit of work: identity, handler-selecting type, and opaque
/// handler-specific configuration.
///
/// Nodes are supplied by the caller and never created or mutated by the
/// engine; per-invocation data (aggregated inputs, side-channel overrides)
/// travels in an [`ExecutionFrame`](crate::handler::ExecutionFrame) instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub config: FxHashMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<NodeType>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: FxHashMap::default(),
        }
    }

    /// Add one configuration entry (builder style).
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Fetch a string-valued configuration field.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

/// A directed dependency from a producer node to a consumer node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// The static graph submitted for one run.
///
/// Edge iteration order is significant: aggregated inputs are assembled by
/// walking a node's incoming edges in their original order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Structural problems detected before any handler runs.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    /// An edge references a node id absent from the node set.
    /// The producer id is not named `source` here; thiserror reserves that
    /// name for the error cause.
    #[error("edge `{edge_source}` -> `{edge_target}` references unknown node `{missing}`")]
    #[diagnostic(
        code(vortexflow::workflow::unknown_edge_endpoint),
        help("Every edge endpoint must name a node present in the same workflow.")
    )]
    UnknownEdgeEndpoint {
        edge_source: String,
        edge_target: String,
        missing: String,
    },

    /// Two nodes share the same id.
    #[error("duplicate node id `{id}`")]
    #[diagnostic(code(vortexflow::workflow::duplicate_node_id))]
    DuplicateNodeId { id: String },
}

impl Workflow {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// All nodes with no incoming edge: the entry points of a run.
    #[must_use]
    pub fn start_nodes(&self) -> Vec<&Node> {
        let targets: FxHashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    /// Ids of direct successors of `id`, deduplicated, edge order preserved.
    #[must_use]
    pub fn outgoers(&self, id: &str) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.edges
            .iter()
            .filter(|e| e.source == id)
            .map(|e| e.target.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Ids of direct predecessors of `id`, deduplicated, edge order
    /// preserved. Aggregation order depends on this.
    #[must_use]
    pub fn incomers(&self, id: &str) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.edges
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.source.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Incoming edges of `id` in original order; duplicates preserved.
    pub fn incoming_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// True if `to` is reachable from `from` by following edges forward.
    #[must_use]
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.outgoers(current));
            }
        }
        false
    }

    /// Check structural invariants: unique node ids, edge endpoints present.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut ids = FxHashSet::default();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(WorkflowError::DuplicateNodeId {
                    id: node.id.clone(),
                });
            }
        }
        for edge in &self.edges {
            for endpoint in [edge.source.as_str(), edge.target.as_str()] {
                if !ids.contains(endpoint) {
                    return Err(WorkflowError::UnknownEdgeEndpoint {
                        edge_source: edge.source.clone(),
                        edge_target: edge.target.clone(),
                        missing: endpoint.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
