use crate::routes::{command_routes, health_routes};
use crate::{AppState, Result, WebError};
use afribac_config::AiConfig;
use afribac_llm::ProviderModelFactory;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Assemble every route with CORS and the body limit from `config`
pub fn build_router(state: AppState, config: &AiConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(command_routes())
        .merge(health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(cors)
}

pub async fn start_server(config: AiConfig) -> Result<()> {
    let addr = config
        .socket_addr()
        .map_err(|e| WebError::Config(e.to_string()))?;

    let keys = config.key_availability();
    let config = Arc::new(config);
    let factory = ProviderModelFactory::new(Arc::clone(&config))
        .map_err(|e| WebError::Config(e.to_string()))?;
    let state = AppState::new(Arc::clone(&config), Arc::new(factory));
    let app = build_router(state, &config);

    tracing::info!(
        openai = keys.openai,
        gemini = keys.gemini,
        "Starting web server on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(WebError::Io)?;

    axum::serve(listener, app).await.map_err(WebError::Io)?;

    Ok(())
}
