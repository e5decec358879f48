//! Mock language models for testing
//!
//! The mocks never touch the network. They replay scripted answers and record
//! every call so tests can assert on prompts and call counts.
//!
//! # Example
//!
//! ```rust,ignore
//! use afribac_core::test_support::mocks::MockLanguageModel;
//! use afribac_core::traits::LanguageModel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = MockLanguageModel::new().with_enum_answer("comment");
//! let answer = model.generate_enum("prompt", &["generate", "comment"]).await?;
//! assert_eq!(answer, "comment");
//! assert_eq!(model.call_count(), 1);
//! # Ok(())
//! # }
//! ```

use crate::traits::{LanguageModel, LlmError, LlmMessage, LlmResult, ModelFactory};
use afribac_config::{ProviderKind, ResolvedModel};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// A recorded call on [`MockLanguageModel`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GenerateEnum { prompt: String, choices: Vec<String> },
    StreamText { messages: Vec<LlmMessage> },
    StreamArray { prompt: String, schema: Value },
}

#[derive(Debug, Default)]
struct Script {
    enum_answer: Option<LlmResult<String>>,
    text_chunks: Vec<LlmResult<String>>,
    array_items: Vec<LlmResult<Value>>,
}

/// Scripted [`LanguageModel`]; clones share the script and the call log
#[derive(Debug, Clone)]
pub struct MockLanguageModel {
    provider: ProviderKind,
    model: String,
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "mock-model".to_string(),
            script: Arc::new(Mutex::new(Script::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_identity(mut self, provider: ProviderKind, model: impl Into<String>) -> Self {
        self.provider = provider;
        self.model = model.into();
        self
    }

    pub fn with_enum_answer(self, answer: impl Into<String>) -> Self {
        self.script.lock().unwrap().enum_answer = Some(Ok(answer.into()));
        self
    }

    pub fn with_enum_error(self, error: LlmError) -> Self {
        self.script.lock().unwrap().enum_answer = Some(Err(error));
        self
    }

    pub fn with_text_chunks<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script.lock().unwrap().text_chunks =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        self
    }

    /// Append a failure after the scripted text chunks
    pub fn with_text_error(self, error: LlmError) -> Self {
        self.script.lock().unwrap().text_chunks.push(Err(error));
        self
    }

    pub fn with_array_items(self, items: Vec<Value>) -> Self {
        self.script.lock().unwrap().array_items = items.into_iter().map(Ok).collect();
        self
    }

    /// Append a failure after the scripted array items
    pub fn with_array_error(self, error: LlmError) -> Self {
        self.script.lock().unwrap().array_items.push(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of classifier calls
    pub fn enum_call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::GenerateEnum { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_enum(&self, prompt: &str, choices: &[&str]) -> LlmResult<String> {
        self.record(MockCall::GenerateEnum {
            prompt: prompt.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        });
        self.script
            .lock()
            .unwrap()
            .enum_answer
            .clone()
            .unwrap_or_else(|| Ok(choices.first().copied().unwrap_or_default().to_string()))
    }

    fn stream_text<'a>(&'a self, messages: Vec<LlmMessage>) -> BoxStream<'a, LlmResult<String>> {
        self.record(MockCall::StreamText { messages });
        let chunks = self.script.lock().unwrap().text_chunks.clone();
        stream::iter(chunks).boxed()
    }

    fn stream_array<'a>(
        &'a self,
        prompt: String,
        item_schema: Value,
    ) -> BoxStream<'a, LlmResult<Value>> {
        self.record(MockCall::StreamArray {
            prompt,
            schema: item_schema,
        });
        let items = self.script.lock().unwrap().array_items.clone();
        stream::iter(items).boxed()
    }
}

/// [`ModelFactory`] handing out clones of two scripted models
#[derive(Debug, Clone, Default)]
pub struct MockModelFactory {
    pub model: MockLanguageModel,
    pub classifier: MockLanguageModel,
    created: Arc<Mutex<Vec<ResolvedModel>>>,
    failure: Option<LlmError>,
}

impl MockModelFactory {
    pub fn new(model: MockLanguageModel, classifier: MockLanguageModel) -> Self {
        Self {
            model,
            classifier,
            created: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Make every `create*` call fail
    pub fn failing(error: LlmError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Resolutions seen by `create`
    pub fn created(&self) -> Vec<ResolvedModel> {
        self.created.lock().unwrap().clone()
    }
}

impl ModelFactory for MockModelFactory {
    fn create(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.created.lock().unwrap().push(resolved.clone());
        Ok(Arc::new(
            self.model
                .clone()
                .with_identity(resolved.provider, resolved.model.clone()),
        ))
    }

    fn create_classifier(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(Arc::new(self.classifier.clone().with_identity(
            resolved.provider,
            format!("{}-classifier", resolved.model),
        )))
    }
}
