//! Gemini model tests against a wiremock server

mod common;

use afribac_core::traits::{LanguageModel, LlmError, LlmMessage};
use afribac_llm::GeminiModel;
use common::{collect_text, collect_values, gemini_chunks, sse_response};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn model(server: &MockServer) -> GeminiModel {
    GeminiModel::new(
        reqwest::Client::new(),
        "gm-test".to_string(),
        server.uri(),
        "gemini-2.5-flash".to_string(),
        5,
    )
}

#[tokio::test]
async fn test_generate_enum_uses_enum_mime_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "gm-test"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "text/x.enum",
                "responseSchema": {"type": "STRING", "enum": ["generate", "edit", "comment"]}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "edit"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = model(&server)
        .generate_enum("Classify", &["generate", "edit", "comment"])
        .await
        .unwrap();

    assert_eq!(answer, "edit");
}

#[tokio::test]
async fn test_generate_enum_without_candidates_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = model(&server)
        .generate_enum("Classify", &["generate"])
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_stream_text_reads_sse_until_eof() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Écris"}]}]
        })))
        .respond_with(sse_response(gemini_chunks(&["Il était ", "une fois"])))
        .mount(&server)
        .await;

    let model = model(&server);
    let text = collect_text(model.stream_text(vec![LlmMessage::user("Écris")]))
        .await
        .unwrap();

    assert_eq!(text, "Il était une fois");
}

#[tokio::test]
async fn test_stream_array_sends_array_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {"type": "ARRAY", "items": {"type": "OBJECT"}}
            }
        })))
        .respond_with(sse_response(gemini_chunks(&[
            r#"[{"blockId":"b1","content":"a","#,
            r#""comment":"x"}]"#,
        ])))
        .mount(&server)
        .await;

    let model = model(&server);
    let items = collect_values(model.stream_array(
        "Review".into(),
        json!({"type": "object", "additionalProperties": false}),
    ))
    .await;

    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].as_ref().unwrap(),
        &json!({"blockId": "b1", "content": "a", "comment": "x"})
    );
}

#[tokio::test]
async fn test_stream_reports_quota_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let model = model(&server);
    let result = collect_text(model.stream_text(vec![LlmMessage::user("x")])).await;

    assert_eq!(
        result,
        Err(LlmError::Api {
            status: 429,
            body: "quota exceeded".into()
        })
    );
}
