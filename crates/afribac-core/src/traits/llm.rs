//! Language model abstraction

use afribac_config::{ProviderKind, ResolvedModel};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result type for model calls
pub type LlmResult<T> = Result<T, LlmError>;

/// Model call failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Message role sent to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Provider-neutral message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// A handle to one model on one provider
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider serving this model
    fn provider(&self) -> ProviderKind;

    /// Model id sent to the provider
    fn model_id(&self) -> &str;

    /// Constrained generation: the answer must be one of `choices`.
    ///
    /// Implementations return the provider's raw answer (trimmed); callers
    /// decide what to do with values outside `choices`.
    async fn generate_enum(&self, prompt: &str, choices: &[&str]) -> LlmResult<String>;

    /// Stream text deltas for a conversation
    fn stream_text<'a>(&'a self, messages: Vec<LlmMessage>) -> BoxStream<'a, LlmResult<String>>;

    /// Stream the elements of a JSON array whose items follow `item_schema`,
    /// each yielded as soon as it is complete
    fn stream_array<'a>(
        &'a self,
        prompt: String,
        item_schema: serde_json::Value,
    ) -> BoxStream<'a, LlmResult<serde_json::Value>>;
}

/// Creates model handles for resolved provider/model pairs
pub trait ModelFactory: Send + Sync {
    /// Model used for generation, editing and comments
    fn create(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>>;

    /// Model used for tool classification on the same provider
    fn create_classifier(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>>;
}
