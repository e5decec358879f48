use afribac_config::AiConfig;
use afribac_core::traits::ModelFactory;
use afribac_core::CommandPipeline;
use std::sync::Arc;

/// Shared, read-only state for every route
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CommandPipeline>,
}

impl AppState {
    pub fn new(config: Arc<AiConfig>, factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            pipeline: Arc::new(CommandPipeline::new(config, factory)),
        }
    }

    pub fn config(&self) -> &AiConfig {
        self.pipeline.config()
    }
}
