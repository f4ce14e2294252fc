//! Built-in node handlers.
//!
//! These cover the stock node types of the engine. They all follow the
//! handler contract strictly: configuration problems and upstream faults
//! are reported as descriptive output strings, never as panics or errors,
//! so a misconfigured node degrades into readable output for its children.

mod combine_text;
mod culture_fit;

#[cfg(feature = "llm")]
mod ask_ai;

pub use combine_text::CombineTextHandler;
pub use culture_fit::CultureFitHandler;

#[cfg(feature = "llm")]
pub use ask_ai::AskAiHandler;

/// Node type string for the prompt-building AI node.
pub const ASK_AI: &str = "askAI";
/// Node type string for the input aggregation node.
pub const COMBINE_TEXT: &str = "combineText";
/// Node type string for the company culture profile node.
pub const CULTURE_FIT: &str = "cultureFit";

/// Render one aggregated input for inclusion in a combined document.
/// JSON objects are pretty-printed; everything else passes through as-is.
pub(crate) fn render_input(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string())
        }
        _ => raw.to_string(),
    }
}
