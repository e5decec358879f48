use afribac_config::ResolveError;
use afribac_core::CommandError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub type Result<T> = std::result::Result<T, WebError>;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Command(CommandError::Resolve(ResolveError::MissingApiKeys)) => {
                StatusCode::UNAUTHORIZED
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status == StatusCode::UNAUTHORIZED {
            json!({ "error": self.to_string() })
        } else {
            json!({
                "error": "Failed to process AI request",
                "details": self.to_string(),
            })
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
