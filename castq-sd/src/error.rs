//! Error types for castq-sd
//!
//! Module-level error enum plus its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::source::SourceError;

/// Main error type for castq-sd
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Commentary source request failed
    #[error("Event source error: {0}")]
    Source(#[from] SourceError),

    /// Owner task has stopped; the mailbox is closed
    #[error("Scheduler unavailable")]
    SchedulerUnavailable,

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using castq-sd Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status used when this error reaches a handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Source(SourceError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Source(_) => StatusCode::BAD_GATEWAY,
            Error::SchedulerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        let body = Json(json!({
            "status": format!("error: {}", self),
        }));
        (status, body).into_response()
    }
}
