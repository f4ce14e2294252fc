//! Core identifier types for the vortexflow engine.
//!
//! Node identity is a plain string supplied by the caller; [`NodeType`] is
//! the newtype that selects which registered handler runs a node. Types are
//! open-ended: the engine performs no type-specific logic beyond the
//! side-channel routing table in [`crate::routing`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects the handler family a node belongs to.
///
/// A `NodeType` is an opaque, caller-defined name (e.g. `"askAI"`,
/// `"combineText"`). It keys the [`HandlerRegistry`](crate::registry::HandlerRegistry)
/// and participates in side-channel routing rules.
///
/// # Examples
///
/// ```rust
/// use vortexflow::types::NodeType;
///
/// let ty = NodeType::new("combineText");
/// assert_eq!(ty.as_str(), "combineText");
///
/// // String literals convert where a NodeType is expected.
/// let same: NodeType = "combineText".into();
/// assert_eq!(ty, same);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Developer experience: allow string literals where a NodeType is expected.
impl From<&str> for NodeType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        Self(s)
    }
}
