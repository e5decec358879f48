//! Configuration types for the AI command service

use crate::resolver::{KeyAvailability, ModelDefaults, ProviderKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;

/// Default values used when neither the config file nor the environment sets a field
pub mod defaults {
    /// Bind address for the HTTP server
    pub const HOST: &str = "127.0.0.1";
    /// Port for the HTTP server
    pub const PORT: u16 = 3030;
    /// Request body limit (10 MB)
    pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
    /// OpenAI API base URL
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    /// Gemini API base URL
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    /// Default OpenAI chat model
    pub const OPENAI_MODEL: &str = "gpt-4o-mini";
    /// Default Gemini model
    pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
    /// Provider request timeout
    pub const TIMEOUT_SECS: u64 = 120;
    /// Number of chat messages replayed into prompts
    pub const HISTORY_LIMIT: usize = 20;
    /// Buffered events per command stream
    pub const CHANNEL_BUFFER: usize = 64;
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AiConfig`].
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// Path that was parsed
        path: String,
        /// Parser message
        message: String,
    },

    /// A field holds a value the service cannot run with.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Offending value
        value: String,
    },
}

/// An API key whose value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only keys count as absent
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Origins allowed by the CORS layer
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

/// Settings for one model provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key (usually supplied through the environment)
    pub api_key: Option<ApiKey>,
    /// Override for the API base URL
    pub base_url: Option<String>,
    /// Model used when the request names none
    pub model: Option<String>,
    /// Model used for tool classification; falls back to `model`
    pub classifier_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderSettings {
    /// Whether a usable key is configured
    pub fn has_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_blank())
    }

    /// Base URL, using the provider default if not specified
    pub fn endpoint(&self, kind: ProviderKind) -> String {
        self.base_url.clone().unwrap_or_else(|| match kind {
            ProviderKind::OpenAi => defaults::OPENAI_BASE_URL.to_string(),
            ProviderKind::Gemini => defaults::GEMINI_BASE_URL.to_string(),
        })
    }

    /// Default model, using the provider default if not specified
    pub fn default_model(&self, kind: ProviderKind) -> String {
        self.model.clone().unwrap_or_else(|| match kind {
            ProviderKind::OpenAi => defaults::OPENAI_MODEL.to_string(),
            ProviderKind::Gemini => defaults::GEMINI_MODEL.to_string(),
        })
    }

    /// Classifier model, falling back to the default model
    pub fn classifier_model(&self, kind: ProviderKind) -> String {
        self.classifier_model
            .clone()
            .unwrap_or_else(|| self.default_model(kind))
    }

    /// Timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(defaults::TIMEOUT_SECS)
    }
}

/// Settings for the command pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandConfig {
    /// How many trailing chat messages are rendered into prompt history
    pub history_limit: usize,
    /// Event channel capacity between the pipeline task and the SSE body
    pub channel_buffer: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            history_limit: defaults::HISTORY_LIMIT,
            channel_buffer: defaults::CHANNEL_BUFFER,
        }
    }
}

/// Top-level configuration
///
/// ```toml
/// [server]
/// host = "0.0.0.0"
/// port = 3030
///
/// [openai]
/// model = "gpt-4o-mini"
///
/// [gemini]
/// model = "gemini-2.5-flash"
/// classifier_model = "gemini-2.5-flash-lite"
///
/// [command]
/// history_limit = 20
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// OpenAI provider settings
    pub openai: ProviderSettings,
    /// Gemini provider settings
    pub gemini: ProviderSettings,
    /// Command pipeline settings
    pub command: CommandConfig,
}

impl AiConfig {
    /// Settings for a provider
    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    /// Which provider keys are configured
    pub fn key_availability(&self) -> KeyAvailability {
        KeyAvailability {
            openai: self.openai.has_key(),
            gemini: self.gemini.has_key(),
        }
    }

    /// Default model per provider, for [`crate::resolve_model`]
    pub fn model_defaults(&self) -> ModelDefaults {
        ModelDefaults {
            openai: self.openai.default_model(ProviderKind::OpenAi),
            gemini: self.gemini.default_model(ProviderKind::Gemini),
        }
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.host".to_string(),
                value: format!("{}:{} ({e})", self.server.host, self.server.port),
            })
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
            });
        }
        if self.command.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "command.history_limit".to_string(),
                value: "0".to_string(),
            });
        }
        if self.command.channel_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "command.channel_buffer".to_string(),
                value: "0".to_string(),
            });
        }
        self.socket_addr().map(|_| ())
    }
}
