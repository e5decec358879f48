//! Creates provider-backed models from configuration

use crate::gemini::GeminiModel;
use crate::openai::OpenAiModel;
use afribac_config::{AiConfig, ProviderKind, ResolvedModel};
use afribac_core::traits::{LanguageModel, LlmError, LlmResult, ModelFactory};
use std::sync::Arc;
use tracing::debug;

/// [`ModelFactory`] backed by the OpenAI and Gemini HTTP APIs.
///
/// One `reqwest::Client` is shared by every model it creates.
#[derive(Clone)]
pub struct ProviderModelFactory {
    config: Arc<AiConfig>,
    client: reqwest::Client,
}

impl ProviderModelFactory {
    pub fn new(config: Arc<AiConfig>) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("afribac/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn build(&self, provider: ProviderKind, model: String) -> LlmResult<Arc<dyn LanguageModel>> {
        let settings = self.config.provider(provider);
        let api_key = settings
            .api_key
            .as_ref()
            .filter(|key| !key.is_blank())
            .ok_or_else(|| LlmError::Config(format!("No API key configured for {provider}")))?
            .expose()
            .to_string();
        let base_url = settings.endpoint(provider);
        let timeout = settings.timeout_secs();

        debug!(%provider, %model, %base_url, "Creating model");

        Ok(match provider {
            ProviderKind::OpenAi => Arc::new(OpenAiModel::new(
                self.client.clone(),
                api_key,
                base_url,
                model,
                timeout,
            )),
            ProviderKind::Gemini => Arc::new(GeminiModel::new(
                self.client.clone(),
                api_key,
                base_url,
                model,
                timeout,
            )),
        })
    }
}

impl ModelFactory for ProviderModelFactory {
    fn create(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>> {
        self.build(resolved.provider, resolved.model.clone())
    }

    fn create_classifier(&self, resolved: &ResolvedModel) -> LlmResult<Arc<dyn LanguageModel>> {
        let settings = self.config.provider(resolved.provider);
        // An explicit classifier model wins; otherwise classify with the
        // request's model
        let model = settings
            .classifier_model
            .clone()
            .unwrap_or_else(|| resolved.model.clone());
        self.build(resolved.provider, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afribac_config::ApiKey;

    fn resolved(provider: ProviderKind, model: &str) -> ResolvedModel {
        ResolvedModel {
            provider,
            model: model.to_string(),
            fell_back: false,
        }
    }

    #[test]
    fn test_creates_model_for_each_provider() {
        let mut config = AiConfig::default();
        config.openai.api_key = Some(ApiKey::new("sk-test"));
        config.gemini.api_key = Some(ApiKey::new("gm-test"));
        let factory = ProviderModelFactory::new(Arc::new(config)).unwrap();

        let openai = factory.create(&resolved(ProviderKind::OpenAi, "gpt-4o")).unwrap();
        assert_eq!(openai.provider(), ProviderKind::OpenAi);
        assert_eq!(openai.model_id(), "gpt-4o");

        let gemini = factory
            .create(&resolved(ProviderKind::Gemini, "gemini-2.5-pro"))
            .unwrap();
        assert_eq!(gemini.provider(), ProviderKind::Gemini);
    }

    #[test]
    fn test_classifier_model_override() {
        let mut config = AiConfig::default();
        config.gemini.api_key = Some(ApiKey::new("gm-test"));
        config.gemini.classifier_model = Some("gemini-2.5-flash-lite".into());
        let factory = ProviderModelFactory::new(Arc::new(config)).unwrap();

        let classifier = factory
            .create_classifier(&resolved(ProviderKind::Gemini, "gemini-2.5-pro"))
            .unwrap();
        assert_eq!(classifier.model_id(), "gemini-2.5-flash-lite");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let factory = ProviderModelFactory::new(Arc::new(AiConfig::default())).unwrap();
        let result = factory.create(&resolved(ProviderKind::OpenAi, "gpt-4o"));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
