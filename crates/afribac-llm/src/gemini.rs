//! Google Gemini model via the Generative Language API

use crate::json_stream::array_elements;
use crate::sse::{api_error, http_error, sse_payloads};
use afribac_config::ProviderKind;
use afribac_core::traits::{LanguageModel, LlmError, LlmMessage, LlmResult, MessageRole};
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiModel {
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

    fn request(&self, method: &str, query: Option<&str>, body: &Value) -> reqwest::RequestBuilder {
        let mut url = format!("{}/models/{}:{method}", self.base_url, self.model);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        self.client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .timeout(self.timeout)
    }

    /// Gemini has no system role in `contents`; system messages become
    /// `systemInstruction`
    fn conversation(messages: &[LlmMessage]) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                let role = match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if !system.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": system.join("\n\n")}]});
        }
        body
    }

    fn single_prompt(prompt: &str) -> Value {
        json!({"contents": [{"role": "user", "parts": [{"text": prompt}]}]})
    }

    fn stream_content(&self, body: Value) -> BoxStream<'static, LlmResult<String>> {
        let mut payloads = sse_payloads(self.request("streamGenerateContent", Some("alt=sse"), &body));

        Box::pin(stream! {
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                match serde_json::from_str::<GenerateResponse>(&payload) {
                    Ok(response) => {
                        let text = response.text();
                        if !text.is_empty() {
                            yield Ok(text);
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
impl LanguageModel for GeminiModel {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_enum(&self, prompt: &str, choices: &[&str]) -> LlmResult<String> {
        let mut body = Self::single_prompt(prompt);
        body["generationConfig"] = json!({
            "responseMimeType": "text/x.enum",
            "responseSchema": {"type": "STRING", "enum": choices}
        });

        let response = self
            .request("generateContent", None, &body)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let answer = parsed.text();
        if answer.trim().is_empty() {
            return Err(LlmError::InvalidResponse("No candidates in response".to_string()));
        }
        debug!(model = %self.model, answer = %answer, "Classifier answered");
        Ok(answer.trim().to_string())
    }

    fn stream_text<'a>(&'a self, messages: Vec<LlmMessage>) -> BoxStream<'a, LlmResult<String>> {
        self.stream_content(Self::conversation(&messages))
    }

    fn stream_array<'a>(
        &'a self,
        prompt: String,
        item_schema: Value,
    ) -> BoxStream<'a, LlmResult<Value>> {
        let mut body = Self::single_prompt(&prompt);
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": {"type": "ARRAY", "items": gemini_schema(&item_schema)}
        });
        array_elements(self.stream_content(body))
    }
}

/// Convert a JSON Schema into Gemini's OpenAPI subset: upper-case types and
/// no `additionalProperties`
pub fn gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "additionalProperties" | "$schema" => {}
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|t| Value::String(t.to_ascii_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        out.insert(key.clone(), upper);
                    }
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|props| {
                                props
                                    .iter()
                                    .map(|(name, prop)| (name.clone(), gemini_schema(prop)))
                                    .collect::<Map<_, _>>()
                            })
                            .map(Value::Object)
                            .unwrap_or_else(|| value.clone());
                        out.insert(key.clone(), props);
                    }
                    _ => {
                        out.insert(key.clone(), gemini_schema(value));
                    }
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(gemini_schema).collect()),
        other => other.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
