//! HTTP client for the remote commentary source
//!
//! Every request is a JSON POST with a hard timeout. Timeouts, transport
//! errors, non-success statuses and undecodable bodies are all reported as
//! `SourceError`; none of them is fatal to the caller.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{ChatRequest, PollRequest, SourceResponse};

/// Failure talking to the commentary source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Endpoint or context id missing
    #[error("Event source not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Source returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Undecodable response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Response body for non-success statuses (surfaced in diagnostics)
    pub fn body(&self) -> Option<&str> {
        match self {
            SourceError::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Client for poll and chat requests
#[derive(Debug, Clone)]
pub struct EventSourceClient {
    http_client: Client,
    timeout: Duration,
}

impl EventSourceClient {
    /// Create a client whose requests fail with `Timeout` after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("castq-sd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one poll request
    pub async fn poll(&self, endpoint: &str, request: &PollRequest) -> Result<SourceResponse, SourceError> {
        debug!(
            context_id = %request.context_id,
            last_seen = ?request.last_seen_event_id,
            skip_expensive = request.skip_expensive_upstream,
            "Polling event source"
        );
        self.post(endpoint, request).await
    }

    /// Issue one chat request
    pub async fn chat(&self, endpoint: &str, request: &ChatRequest) -> Result<SourceResponse, SourceError> {
        debug!(context_id = %request.context_id, "Sending chat request");
        self.post(endpoint, request).await
    }

    async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<SourceResponse, SourceError> {
        let response = self
            .http_client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        SourceResponse::parse(&text)
    }

    fn classify(&self, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Network(error.to_string())
        }
    }
}
