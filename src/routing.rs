//! Type-pair routing of outputs outside the positional input list.
//!
//! Most parent outputs reach a child through its ordered input list. Some
//! producer/consumer type pairings instead deliver the producer's output
//! into a named field of the consumer's frame, bypassing the positional
//! list entirely. Those pairings are declared here.

use crate::handlers::{ASK_AI, CULTURE_FIT};
use crate::types::NodeType;

/// One declarative pairing: outputs of `producer`-typed nodes feeding a
/// `consumer`-typed node land in the consumer's side channel under `field`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideChannelRule {
    pub producer: NodeType,
    pub consumer: NodeType,
    pub field: String,
}

impl SideChannelRule {
    #[must_use]
    pub fn new(
        producer: impl Into<NodeType>,
        consumer: impl Into<NodeType>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
            field: field.into(),
        }
    }
}

/// Ordered collection of side channel rules consulted during frame assembly.
///
/// The default table carries the built-in pairing: culture fit analyses
/// feeding an AI prompt node are delivered as its `context` field instead of
/// being appended to the prompt inputs.
#[derive(Clone, Debug)]
pub struct RoutingTable {
    rules: Vec<SideChannelRule>,
}

impl RoutingTable {
    /// A table with no rules; every output travels positionally.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SideChannelRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Field name for the `producer` -> `consumer` pairing, if a rule
    /// matches. First matching rule wins.
    #[must_use]
    pub fn route(&self, producer: &NodeType, consumer: &NodeType) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| &rule.producer == producer && &rule.consumer == consumer)
            .map(|rule| rule.field.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::empty().with_rule(SideChannelRule::new(CULTURE_FIT, ASK_AI, "context"))
    }
}
