//! OpenAI chat completions model

use crate::json_stream::array_elements;
use crate::sse::{api_error, http_error, sse_payloads};
use afribac_config::ProviderKind;
use afribac_core::traits::{LanguageModel, LlmError, LlmMessage, LlmResult, MessageRole};
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// One OpenAI model reached through `/chat/completions`
pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiModel {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .timeout(self.timeout)
    }

    fn messages(messages: &[LlmMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        MessageRole::System => "system",
                        MessageRole::User => "user",
                        MessageRole::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    /// Text deltas of a streamed completion
    fn stream_content(&self, mut body: Value) -> BoxStream<'static, LlmResult<String>> {
        body["stream"] = json!(true);
        let mut payloads = sse_payloads(self.request(&body));

        Box::pin(stream! {
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                match serde_json::from_str::<StreamChunk>(&payload) {
                    Ok(chunk) => {
                        let content = chunk
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                            .unwrap_or_default();
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(format!(
                            "Failed to parse stream chunk: {e}"
                        )));
                        return;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_enum(&self, prompt: &str, choices: &[&str]) -> LlmResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "choice",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "result": {"type": "string", "enum": choices}
                        },
                        "required": ["result"],
                        "additionalProperties": false
                    }
                }
            }
        });

        let response = self.request(&body).send().await.map_err(http_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        debug!(model = %self.model, answer = %content, "Classifier answered");

        // Strict mode returns {"result": ...}; tolerate a bare string too
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map
                .get("result")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| LlmError::InvalidResponse(format!("Missing result in {content}"))),
            Ok(Value::String(s)) => Ok(s.trim().to_string()),
            _ => Ok(content.trim().to_string()),
        }
    }

    fn stream_text<'a>(&'a self, messages: Vec<LlmMessage>) -> BoxStream<'a, LlmResult<String>> {
        let body = json!({
            "model": self.model,
            "messages": Self::messages(&messages),
        });
        self.stream_content(body)
    }

    fn stream_array<'a>(
        &'a self,
        prompt: String,
        item_schema: Value,
    ) -> BoxStream<'a, LlmResult<Value>> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "elements",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "elements": {"type": "array", "items": item_schema}
                        },
                        "required": ["elements"],
                        "additionalProperties": false
                    }
                }
            }
        });
        array_elements(self.stream_content(body))
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
