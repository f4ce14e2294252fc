//! Gemini handler behavior against a mock endpoint.

use httpmock::prelude::*;
use serde_json::json;

use vortexflow::handler::{ExecutionFrame, HandlerContext, NodeHandler};
use vortexflow::handlers::AskAiHandler;
use vortexflow::workflow::Node;

fn ctx() -> (HandlerContext, flume::Receiver<vortexflow::event_bus::Event>) {
    let (tx, rx) = flume::unbounded();
    (HandlerContext::new("ai".into(), "run".into(), tx), rx)
}

fn candidates_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

#[tokio::test]
async fn returns_candidate_text_on_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-pro-latest:generateContent")
                .query_param("key", "test-key");
            then.status(200).json_body(candidates_body("mocked reply"));
        })
        .await;

    let handler = AskAiHandler::new()
        .with_base_url(server.base_url())
        .with_api_key("test-key");
    let (ctx, _rx) = ctx();
    let out = handler
        .execute(
            &Node::new("ai", "askAI").with_config("prompt", json!("hello")),
            ExecutionFrame::default(),
            ctx,
        )
        .await;

    assert_eq!(out, "mocked reply");
    mock.assert_async().await;
}

#[tokio::test]
async fn side_channel_context_overrides_config_context() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-pro-latest:generateContent")
                .json_body(json!({
                    "contents": [
                        { "parts": [ { "text": "SIDE\n\nP" } ] }
                    ]
                }));
            then.status(200).json_body(candidates_body("ok"));
        })
        .await;

    let mut frame = ExecutionFrame::default();
    frame
        .side_channel
        .insert("context".to_string(), "SIDE".to_string());

    let handler = AskAiHandler::new()
        .with_base_url(server.base_url())
        .with_api_key("k");
    let (ctx, _rx) = ctx();
    let out = handler
        .execute(
            &Node::new("ai", "askAI")
                .with_config("prompt", json!("P"))
                .with_config("context", json!("CFG")),
            frame,
            ctx,
        )
        .await;

    assert_eq!(out, "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn api_error_body_becomes_output_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(429)
                .json_body(json!({ "error": { "message": "quota exceeded" } }));
        })
        .await;

    let handler = AskAiHandler::new()
        .with_base_url(server.base_url())
        .with_api_key("k");
    let (ctx, _rx) = ctx();
    let out = handler
        .execute(&Node::new("ai", "askAI"), ExecutionFrame::default(), ctx)
        .await;

    assert_eq!(out, "API Error: quota exceeded");
}

#[tokio::test]
async fn missing_candidate_text_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({ "candidates": [] }));
        })
        .await;

    let handler = AskAiHandler::new()
        .with_base_url(server.base_url())
        .with_api_key("k");
    let (ctx, _rx) = ctx();
    let out = handler
        .execute(&Node::new("ai", "askAI"), ExecutionFrame::default(), ctx)
        .await;

    assert_eq!(out, "Error processing response: no candidate text returned");
}

#[tokio::test]
async fn unreachable_endpoint_degrades_into_output() {
    let handler = AskAiHandler::new()
        .with_base_url("http://127.0.0.1:9")
        .with_api_key("k");
    let (ctx, _rx) = ctx();
    let out = handler
        .execute(&Node::new("ai", "askAI"), ExecutionFrame::default(), ctx)
        .await;
    assert!(out.starts_with("Unexpected error:"), "got: {out}");
}

#[tokio::test]
async fn request_emits_progress_event() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(candidates_body("ok"));
        })
        .await;

    let handler = AskAiHandler::new()
        .with_base_url(server.base_url())
        .with_api_key("k");
    let (ctx, rx) = ctx();
    handler
        .execute(&Node::new("ai", "askAI"), ExecutionFrame::default(), ctx)
        .await;

    let event = rx.try_recv().unwrap();
    assert_eq!(event.scope_label(), "llm:request");
}
