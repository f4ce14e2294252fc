use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::handler::{ExecutionFrame, HandlerContext, NodeHandler};
use crate::handlers::render_input;
use crate::workflow::Node;

const GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Sends an assembled prompt to the Gemini `generateContent` endpoint.
///
/// The prompt is built from three parts: a context block (the `context`
/// side channel field when present, otherwise the node's `context` config),
/// every positional input rendered in order, and the node's `prompt`
/// config. The API key comes from the handler override or the
/// `GEMINI_API_KEY` environment variable. All transport and API faults are
/// reported as output strings.
pub struct AskAiHandler {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AskAiHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }

    /// Point the handler at a different endpoint root. Used to target
    /// mock servers.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Supply the API key directly instead of reading the environment.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
    }
}

impl Default for AskAiHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for AskAiHandler {
    async fn execute(&self, node: &Node, frame: ExecutionFrame, ctx: HandlerContext) -> String {
        let Some(api_key) = self.resolve_api_key() else {
            return "Error: GEMINI_API_KEY environment variable is not set".to_string();
        };

        let prompt = node.config_str("prompt").unwrap_or("");
        let context = frame
            .side_channel
            .get("context")
            .map(String::as_str)
            .or_else(|| node.config_str("context"))
            .unwrap_or("");

        let mut combined_input = String::new();
        for input in &frame.inputs {
            combined_input.push_str(&render_input(input));
            combined_input.push_str("\n\n");
        }
        let final_prompt = format!("{context}\n{combined_input}\n{prompt}");

        debug!(node = %node.id, prompt_len = final_prompt.len(), "calling model");
        let _ = ctx.emit("llm:request", format!("sending prompt to {GEMINI_MODEL}"));

        let url = format!(
            "{}/v1beta/models/{GEMINI_MODEL}:generateContent?key={api_key}",
            self.base_url
        );
        let payload = json!({
            "contents": [
                { "parts": [ { "text": final_prompt } ] }
            ]
        });

        let response = match self.client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(err) => return format!("Unexpected error: {err}"),
        };
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => return format!("Error processing response: {err}"),
        };

        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return format!("API Error: {message}");
        }

        match body["candidates"][0]["content"]["parts"][0]["text"].as_str() {
            Some(text) => text.to_string(),
            None => "Error processing response: no candidate text returned".to_string(),
        }
    }
}
