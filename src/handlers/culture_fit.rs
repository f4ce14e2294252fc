use async_trait::async_trait;
use tracing::warn;

use crate::handler::{ExecutionFrame, HandlerContext, NodeHandler};
use crate::workflow::Node;

/// Default trait weights applied when the node config omits `weights`.
const DEFAULT_WEIGHTS: [(&str, f64); 5] = [
    ("resourcefulness", 5.0),
    ("optimism", 4.0),
    ("excitement", 4.0),
    ("reliability", 3.0),
    ("teamwork", 3.0),
];

/// Formats a company culture profile from node configuration.
///
/// Reads `companyValues` (required, non-blank) and an optional `weights`
/// object mapping trait names to numbers between 1 and 10. Invalid
/// configuration produces an `Error: ...` output string instead of failing
/// the run.
pub struct CultureFitHandler;

#[async_trait]
impl NodeHandler for CultureFitHandler {
    async fn execute(&self, node: &Node, _frame: ExecutionFrame, _ctx: HandlerContext) -> String {
        let company_values = node.config_str("companyValues").unwrap_or("");
        if company_values.trim().is_empty() {
            warn!(node = %node.id, "company values missing");
            return "Error: Company values cannot be empty.".to_string();
        }

        let weights: Vec<(String, f64)> = match node.config.get("weights") {
            None => DEFAULT_WEIGHTS
                .iter()
                .map(|(name, value)| ((*name).to_string(), *value))
                .collect(),
            Some(serde_json::Value::Object(map)) if !map.is_empty() => {
                let mut collected = Vec::with_capacity(map.len());
                for (name, value) in map {
                    let Some(weight) = value.as_f64().filter(|w| (1.0..=10.0).contains(w)) else {
                        warn!(node = %node.id, trait_name = %name, "weight out of range");
                        return format!(
                            "Error: Invalid weight for {name}: {value}. Must be between 1 and 10."
                        );
                    };
                    collected.push((name.clone(), weight));
                }
                collected
            }
            Some(_) => {
                warn!(node = %node.id, "weights must be a non-empty object");
                return "Error: Weights must be a non-empty object.".to_string();
            }
        };

        let weights_line = weights
            .iter()
            .map(|(name, weight)| format!("{name}: {weight}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Company Values: {company_values}\nWeights: {weights_line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> HandlerContext {
        let (tx, rx) = flume::unbounded();
        std::mem::forget(rx);
        HandlerContext::new("culture".into(), "run".into(), tx)
    }

    #[tokio::test]
    async fn missing_values_yield_error_output() {
        let out = CultureFitHandler
            .execute(
                &Node::new("culture", "cultureFit"),
                ExecutionFrame::default(),
                ctx(),
            )
            .await;
        assert_eq!(out, "Error: Company values cannot be empty.");
    }

    #[tokio::test]
    async fn defaults_apply_when_weights_absent() {
        let node = Node::new("culture", "cultureFit")
            .with_config("companyValues", json!("Curiosity and candor"));
        let out = CultureFitHandler
            .execute(&node, ExecutionFrame::default(), ctx())
            .await;
        assert!(out.starts_with("Company Values: Curiosity and candor\nWeights: "));
        assert!(out.contains("resourcefulness: 5"));
        assert!(out.contains("teamwork: 3"));
    }

    #[tokio::test]
    async fn custom_weights_keep_document_order() {
        // serde_json's preserve_order feature keeps object keys as written,
        // so the weighting line reads in the caller's order.
        let node = Node::new("culture", "cultureFit")
            .with_config("companyValues", json!("candor"))
            .with_config("weights", json!({"zeal": 5, "accuracy": 3, "mentoring": 7}));
        let out = CultureFitHandler
            .execute(&node, ExecutionFrame::default(), ctx())
            .await;
        assert_eq!(
            out,
            "Company Values: candor\nWeights: zeal: 5, accuracy: 3, mentoring: 7"
        );
    }

    #[tokio::test]
    async fn out_of_range_weight_is_rejected() {
        let node = Node::new("culture", "cultureFit")
            .with_config("companyValues", json!("candor"))
            .with_config("weights", json!({"optimism": 11}));
        let out = CultureFitHandler
            .execute(&node, ExecutionFrame::default(), ctx())
            .await;
        assert_eq!(
            out,
            "Error: Invalid weight for optimism: 11. Must be between 1 and 10."
        );
    }

    #[tokio::test]
    async fn empty_weights_object_is_rejected() {
        let node = Node::new("culture", "cultureFit")
            .with_config("companyValues", json!("candor"))
            .with_config("weights", json!({}));
        let out = CultureFitHandler
            .execute(&node, ExecutionFrame::default(), ctx())
            .await;
        assert_eq!(out, "Error: Weights must be a non-empty object.");
    }
}
