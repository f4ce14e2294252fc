//! Mapping from node type strings to handler implementations.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::handler::NodeHandler;
use crate::types::NodeType;

/// Registry of node handlers keyed by [`NodeType`].
///
/// Built once before a run via the chaining [`register`](Self::register)
/// method and shared read-only by the scheduler afterwards. Registering the
/// same type twice replaces the earlier handler.
///
/// ```
/// use std::sync::Arc;
/// use vortexflow::registry::HandlerRegistry;
/// use vortexflow::handlers::CombineTextHandler;
///
/// let registry = HandlerRegistry::new()
///     .register("combineText", Arc::new(CombineTextHandler));
/// assert!(registry.contains(&"combineText".into()));
/// ```
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<NodeType, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a node type, replacing any previous handler.
    #[must_use]
    pub fn register(mut self, node_type: impl Into<NodeType>, handler: Arc<dyn NodeHandler>) -> Self {
        self.handlers.insert(node_type.into(), handler);
        self
    }

    #[must_use]
    pub fn get(&self, node_type: &NodeType) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    #[must_use]
    pub fn contains(&self, node_type: &NodeType) -> bool {
        self.handlers.contains_key(node_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(NodeType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("types", &types)
            .finish()
    }
}
