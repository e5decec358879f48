//! Shared helpers for provider tests

#![allow(dead_code)]

use afribac_core::traits::LlmResult;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use wiremock::ResponseTemplate;

/// Join `payloads` as an SSE body
pub fn sse_body(payloads: &[String]) -> String {
    payloads.iter().map(|p| format!("data: {p}\n\n")).collect()
}

pub fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

/// OpenAI streaming chunks carrying `deltas`, terminated by `[DONE]`
pub fn openai_chunks(deltas: &[&str]) -> String {
    let mut payloads: Vec<String> = deltas
        .iter()
        .map(|d| {
            serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "choices": [{"index": 0, "delta": {"content": d}, "finish_reason": null}]
            })
            .to_string()
        })
        .collect();
    payloads.push("[DONE]".to_string());
    sse_body(&payloads)
}

/// Gemini SSE chunks carrying `deltas`
pub fn gemini_chunks(deltas: &[&str]) -> String {
    let payloads: Vec<String> = deltas
        .iter()
        .map(|d| {
            serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": d}]}}]
            })
            .to_string()
        })
        .collect();
    sse_body(&payloads)
}

pub async fn collect_text(stream: BoxStream<'_, LlmResult<String>>) -> LlmResult<String> {
    let chunks: Vec<LlmResult<String>> = stream.collect().await;
    chunks.into_iter().collect()
}

pub async fn collect_values(stream: BoxStream<'_, LlmResult<Value>>) -> Vec<LlmResult<Value>> {
    stream.collect().await
}
