use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

pub const BUSY_MESSAGE: &str = "AI is busy right now. Please try again in a few seconds.";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate content.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("jobTitle is required")]
    MissingJobTitle,

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    /// Retry budget spent on transient upstream failures.
    #[error("Upstream busy: {0}")]
    UpstreamBusy(LlmError),

    #[error("Generation failed: {0}")]
    Generation(LlmError),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        if e.is_retryable() {
            AppError::UpstreamBusy(e)
        } else {
            AppError::Generation(e)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "message": "Method Not Allowed" }),
            ),
            AppError::MissingJobTitle => {
                tracing::warn!("Rejected tailor request: jobTitle missing");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "jobTitle is required" }),
                )
            }
            AppError::InvalidBody(detail) => {
                tracing::warn!("Rejected tailor request: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "Invalid JSON body", "error": detail }),
                )
            }
            AppError::UpstreamBusy(e) => {
                tracing::error!(status = ?e.status(), "Upstream busy, retries exhausted: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "message": BUSY_MESSAGE, "error": e.to_string() }),
                )
            }
            AppError::Generation(e) => {
                tracing::error!(status = ?e.status(), "Error in /api/tailor: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": GENERATION_FAILED_MESSAGE, "error": e.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
