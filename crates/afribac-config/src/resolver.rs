//! Provider and model resolution
//!
//! Every command request names (optionally) a model as `"<prefix>/<name>"` and/or
//! a provider. [`resolve_model`] turns that plus the configured key set into
//! exactly one provider and model, with no network or environment access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini
    #[serde(alias = "google")]
    Gemini,
}

impl ProviderKind {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// The provider used when this one has no key
    pub fn other(&self) -> Self {
        match self {
            ProviderKind::OpenAi => ProviderKind::Gemini,
            ProviderKind::Gemini => ProviderKind::OpenAi,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ResolveError::UnknownProvider(other.to_string())),
        }
    }
}

/// Resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No provider has a key; nothing can be called.
    #[error("Missing API key: set OPENAI_API_KEY or GOOGLE_GENERATIVE_AI_API_KEY")]
    MissingApiKeys,

    /// Provider name outside the supported set.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// Which providers have a configured key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyAvailability {
    /// `OPENAI_API_KEY` present
    pub openai: bool,
    /// `GOOGLE_GENERATIVE_AI_API_KEY` present
    pub gemini: bool,
}

impl KeyAvailability {
    /// Whether a provider has a key
    pub fn has(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAi => self.openai,
            ProviderKind::Gemini => self.gemini,
        }
    }

    /// At least one key is present
    pub fn any(&self) -> bool {
        self.openai || self.gemini
    }
}

/// Per-provider default models
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefaults {
    /// OpenAI default model
    pub openai: String,
    /// Gemini default model
    pub gemini: String,
}

impl ModelDefaults {
    /// Default model for a provider
    pub fn for_provider(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            openai: crate::defaults::OPENAI_MODEL.to_string(),
            gemini: crate::defaults::GEMINI_MODEL.to_string(),
        }
    }
}

/// What the caller asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// Model id, optionally prefixed with a provider (`"openai/gpt-4o"`)
    pub model: Option<String>,
    /// Explicit provider, used when the model id carries no prefix
    pub provider: Option<ProviderKind>,
}

/// Outcome of [`resolve_model`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// Provider to call
    pub provider: ProviderKind,
    /// Model id without provider prefix
    pub model: String,
    /// True when the requested provider had no key and the other one was used
    pub fell_back: bool,
}

/// Split `"<prefix>/<name>"` into a provider and a bare model name.
///
/// Unknown or missing prefixes keep the whole string as the model name.
pub fn parse_model_id(model: &str) -> (Option<ProviderKind>, String) {
    if let Some((prefix, name)) = model.split_once('/') {
        if let Ok(kind) = prefix.parse::<ProviderKind>() {
            if !name.is_empty() {
                return (Some(kind), name.to_string());
            }
        }
    }
    (None, model.to_string())
}

/// Resolve the provider and model for one request.
///
/// | keys          | request                   | result                         |
/// |---------------|---------------------------|--------------------------------|
/// | none          | anything                  | `MissingApiKeys`               |
/// | both          | nothing                   | gemini + default               |
/// | openai only   | nothing                   | openai + default               |
/// | gemini only   | `openai/gpt-4o`           | gemini + default, `fell_back`  |
/// | both          | `openai/gpt-4o`           | openai + `gpt-4o`              |
pub fn resolve_model(
    request: &ModelRequest,
    keys: KeyAvailability,
    defaults: &ModelDefaults,
) -> Result<ResolvedModel, ResolveError> {
    if !keys.any() {
        return Err(ResolveError::MissingApiKeys);
    }

    let (prefix, name) = match request.model.as_deref().map(str::trim) {
        Some(model) if !model.is_empty() => {
            let (prefix, name) = parse_model_id(model);
            (prefix, Some(name))
        }
        _ => (None, None),
    };

    let requested = prefix.or(request.provider).unwrap_or(if keys.gemini {
        ProviderKind::Gemini
    } else {
        ProviderKind::OpenAi
    });

    if keys.has(requested) {
        return Ok(ResolvedModel {
            provider: requested,
            model: name.unwrap_or_else(|| defaults.for_provider(requested).to_string()),
            fell_back: false,
        });
    }

    let fallback = requested.other();
    warn!(
        requested = %requested,
        fallback = %fallback,
        discarded_model = ?name,
        "Requested provider has no API key, falling back"
    );

    Ok(ResolvedModel {
        provider: fallback,
        model: defaults.for_provider(fallback).to_string(),
        fell_back: true,
    })
}
