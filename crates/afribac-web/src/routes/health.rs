//! Health check endpoints

use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "afribac-web"
    }))
}

/// Ready once at least one provider key is configured
async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let keys = state.config().key_availability();
    let status = if keys.any() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if keys.any() { "ready" } else { "unconfigured" },
            "providers": {
                "openai": keys.openai,
                "gemini": keys.gemini,
            }
        })),
    )
}
