use async_trait::async_trait;

use crate::handler::{ExecutionFrame, HandlerContext, NodeHandler};
use crate::handlers::render_input;
use crate::workflow::Node;

/// Aggregates every positional input into one labelled document.
///
/// Each input is emitted under a `--- Source N ---` header in arrival
/// order. Inputs that parse as JSON objects are pretty-printed so that
/// structured upstream outputs stay readable in the combined text.
pub struct CombineTextHandler;

#[async_trait]
impl NodeHandler for CombineTextHandler {
    async fn execute(&self, _node: &Node, frame: ExecutionFrame, _ctx: HandlerContext) -> String {
        if frame.inputs.is_empty() {
            return "No input data provided to the combine node.".to_string();
        }

        let mut combined = String::new();
        for (index, input) in frame.inputs.iter().enumerate() {
            combined.push_str(&format!("--- Source {} ---\n", index + 1));
            combined.push_str(&render_input(input));
            combined.push_str("\n\n");
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HandlerContext {
        let (tx, rx) = flume::unbounded();
        std::mem::forget(rx);
        HandlerContext::new("combine".into(), "run".into(), tx)
    }

    #[tokio::test]
    async fn empty_inputs_report_missing_data() {
        let out = CombineTextHandler
            .execute(
                &Node::new("combine", "combineText"),
                ExecutionFrame::default(),
                ctx(),
            )
            .await;
        assert_eq!(out, "No input data provided to the combine node.");
    }

    #[tokio::test]
    async fn inputs_are_labelled_in_order() {
        let frame = ExecutionFrame::new(vec!["first".into(), "second".into()], Default::default());
        let out = CombineTextHandler
            .execute(&Node::new("combine", "combineText"), frame, ctx())
            .await;
        assert_eq!(
            out,
            "--- Source 1 ---\nfirst\n\n--- Source 2 ---\nsecond\n\n"
        );
    }

    #[tokio::test]
    async fn json_object_inputs_are_pretty_printed() {
        let frame = ExecutionFrame::new(vec![r#"{"k":"v"}"#.into()], Default::default());
        let out = CombineTextHandler
            .execute(&Node::new("combine", "combineText"), frame, ctx())
            .await;
        assert!(out.starts_with("--- Source 1 ---\n{\n"));
        assert!(out.contains("\"k\": \"v\""));
    }
}
