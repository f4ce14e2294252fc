use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Scope attached to the diagnostic event emitted when a run begins.
pub const RUN_START_SCOPE: &str = "run:start";
/// Scope attached to the diagnostic event emitted when a run completes.
pub const RUN_COMPLETE_SCOPE: &str = "run:complete";

/// A structured event produced during a workflow run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    /// Node-scoped progress, carrying the node id and run id when known.
    Node(NodeEvent),
    /// Run-level or engine-level diagnostics.
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn node_message_with_meta(
        node_id: impl Into<String>,
        run_id: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Node(NodeEvent::new(
            Some(node_id.into()),
            Some(run_id.into()),
            scope.into(),
            message.into(),
        ))
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    #[must_use]
    pub fn scope_label(&self) -> &str {
        match self {
            Event::Node(node) => node.scope(),
            Event::Diagnostic(diag) => diag.scope(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Event::Node(node) => node.message(),
            Event::Diagnostic(diag) => diag.message(),
        }
    }

    /// Convert to a normalized JSON value:
    /// `{type, scope, message, timestamp, metadata}`.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let (event_type, metadata) = match self {
            Event::Node(node) => {
                let mut meta = serde_json::Map::new();
                if let Some(node_id) = node.node_id() {
                    meta.insert("node_id".to_string(), json!(node_id));
                }
                if let Some(run_id) = node.run_id() {
                    meta.insert("run_id".to_string(), json!(run_id));
                }
                ("node", Value::Object(meta))
            }
            Event::Diagnostic(_) => ("diagnostic", Value::Object(serde_json::Map::new())),
        };

        let timestamp: DateTime<Utc> = Utc::now();
        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": timestamp.to_rfc3339(),
            "metadata": metadata,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Node(node) => match node.node_id() {
                Some(id) => write!(f, "[{id}] {}", node.message()),
                None => write!(f, "{}", node.message()),
            },
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEvent {
    node_id: Option<String>,
    run_id: Option<String>,
    scope: String,
    message: String,
}

impl NodeEvent {
    pub fn new(
        node_id: Option<String>,
        run_id: Option<String>,
        scope: String,
        message: String,
    ) -> Self {
        Self {
            node_id,
            run_id,
            scope,
            message,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
