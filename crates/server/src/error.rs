use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use copydesk_auth::AuthError;
use copydesk_core::{TaskStatus, ValidationError};
use copydesk_insights::InsightsError;
use copydesk_pipeline::PipelineError;

/// Errors surfaced through the HTTP API.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request payload.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller may not act on the requested tenant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown task id.
    #[error("not found")]
    NotFound,

    /// A state-machine precondition was violated.
    #[error("task is {actual}, expected {expected}")]
    InvalidStatus {
        actual: TaskStatus,
        expected: TaskStatus,
    },

    /// A concurrent writer got there first.
    #[error("task changed concurrently, now {actual}")]
    Conflict { actual: TaskStatus },

    /// The generation call exhausted its retries; the task is untouched.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A required upstream call failed.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    /// Catch-all for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ServerError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized(msg) => Self::Unauthorized(msg),
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Signing(msg) => Self::Internal(msg),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => Self::Validation(e),
            PipelineError::NotFound(_) => Self::NotFound,
            PipelineError::InvalidStatus { actual, expected } => {
                Self::InvalidStatus { actual, expected }
            }
            PipelineError::Conflict { actual } => Self::Conflict { actual },
            PipelineError::Generation(e) => Self::Generation(e.to_string()),
            PipelineError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<InsightsError> for ServerError {
    fn from(err: InsightsError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "validation_error",
                    "details": { "field": e.field, "message": e.message },
                }),
            ),
            Self::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": msg }),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg })),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "not found" }),
            ),
            Self::InvalidStatus { .. } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "invalid_status", "message": self.to_string() }),
            ),
            Self::Conflict { .. } => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": "conflict", "message": self.to_string() }),
            ),
            Self::Generation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "generation_failed", "details": msg }),
            ),
            Self::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": "upstream_unavailable", "message": msg }),
            ),
            Self::Config(msg) | Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
            Self::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string() }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
