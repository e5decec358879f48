//! Layered loading: defaults, then TOML file, then environment

use crate::config::{AiConfig, ApiKey, ConfigError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// OpenAI API key variable
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Gemini API key variable
pub const ENV_GEMINI_API_KEY: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
/// OpenAI base URL override
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
/// Gemini base URL override
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
/// Server host override
pub const ENV_HOST: &str = "AFRIBAC_HOST";
/// Server port override
pub const ENV_PORT: &str = "AFRIBAC_PORT";

impl AiConfig {
    /// Load configuration.
    ///
    /// With `path`, that file must exist. Without it, `~/.config/afribac/config.toml`
    /// is read when present. Environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env();
        config.validate()?;

        let keys = config.key_availability();
        if !keys.any() {
            warn!(
                "Neither {} nor {} is set; AI commands will be rejected",
                ENV_OPENAI_API_KEY, ENV_GEMINI_API_KEY
            );
        }

        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: AiConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides using a custom variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
            self.openai.api_key = Some(ApiKey::new(key));
        }
        if let Some(key) = lookup(ENV_GEMINI_API_KEY) {
            self.gemini.api_key = Some(ApiKey::new(key));
        }
        if let Some(url) = lookup(ENV_OPENAI_BASE_URL) {
            self.openai.base_url = Some(url);
        }
        if let Some(url) = lookup(ENV_GEMINI_BASE_URL) {
            self.gemini.base_url = Some(url);
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(%port, "Ignoring invalid {}", ENV_PORT),
            }
        }
    }
}

/// `~/.config/afribac/config.toml` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("afribac").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderKind;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_keys_are_applied() {
        let mut config = AiConfig::default();
        config.apply_env_with(lookup_from(&[
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_GEMINI_API_KEY, "g-test"),
        ]));

        let keys = config.key_availability();
        assert!(keys.openai);
        assert!(keys.gemini);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = AiConfig::default();
        config.apply_env_with(lookup_from(&[(ENV_OPENAI_API_KEY, "")]));
        assert!(!config.key_availability().openai);
    }

    #[test]
    fn test_invalid_port_keeps_previous_value() {
        let mut config = AiConfig::default();
        config.apply_env_with(lookup_from(&[(ENV_PORT, "eighty")]));
        assert_eq!(config.server.port, crate::defaults::PORT);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [server]
            port = 4000

            [openai]
            base_url = "http://file.example"
            "#
        )
        .unwrap();

        let mut config = AiConfig::from_file(file.path()).unwrap();
        config.apply_env_with(lookup_from(&[
            (ENV_PORT, "5000"),
            (ENV_OPENAI_BASE_URL, "http://env.example"),
        ]));

        assert_eq!(config.server.port, 5000);
        assert_eq!(
            config.openai.endpoint(ProviderKind::OpenAi),
            "http://env.example"
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AiConfig::load(Some(Path::new("/nonexistent/afribac.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let result = AiConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    #[serial]
    fn test_load_reads_process_environment() {
        std::env::set_var(ENV_GEMINI_API_KEY, "g-from-env");
        std::env::remove_var(ENV_OPENAI_API_KEY);

        let file = tempfile::NamedTempFile::new().unwrap();
        let config = AiConfig::load(Some(file.path())).unwrap();

        assert!(config.key_availability().gemini);
        assert!(!config.key_availability().openai);
        std::env::remove_var(ENV_GEMINI_API_KEY);
    }
}
