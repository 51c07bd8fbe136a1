// ABOUTME: Error types for router construction and per-request action dispatch
// ABOUTME: Build-time failures are MountError; request-time failures render as ActionError responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors raised while building a router. These are startup failures the
/// caller has to fix before serving.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MountError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        MountError::InvalidArgument(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        MountError::Configuration(message.into())
    }
}

/// A failed action, carrying the status and message sent to the client.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct ActionError {
    pub status: StatusCode,
    pub message: String,
}

impl ActionError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(e: anyhow::Error) -> Self {
        ActionError::internal(e.to_string())
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
