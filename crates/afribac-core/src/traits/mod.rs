//! Abstractions implemented outside this crate
//!
//! The pipeline only talks to models through [`LanguageModel`]; concrete
//! HTTP providers live in `afribac-llm` and are injected via [`ModelFactory`].

pub mod llm;

pub use llm::{LanguageModel, LlmError, LlmMessage, LlmResult, MessageRole, ModelFactory};
