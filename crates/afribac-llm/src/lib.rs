//! # Afribac LLM
//!
//! HTTP implementations of [`afribac_core::traits::LanguageModel`]:
//!
//! - [`OpenAiModel`]: `/chat/completions` with JSON-schema structured output
//!   and SSE streaming
//! - [`GeminiModel`]: `:generateContent` / `:streamGenerateContent?alt=sse`
//!   with `responseSchema`
//!
//! [`ProviderModelFactory`] builds them from an [`afribac_config::AiConfig`].

pub mod factory;
pub mod gemini;
pub mod json_stream;
pub mod openai;
pub mod sse;

pub use factory::ProviderModelFactory;
pub use gemini::GeminiModel;
pub use openai::OpenAiModel;
