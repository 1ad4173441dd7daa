//! Error types for the Jalapeño API client.

use thiserror::Error;

use jalapeno_core::OrderValidationError;

/// Errors that can occur when talking to the Jalapeño API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, or the raw body.
        detail: String,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse a response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response stream broke off.
    #[error("stream error: {0}")]
    Stream(String),

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<OrderValidationError> for ClientError {
    fn from(err: OrderValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// Error body produced by the API (`{"detail": "..."}`).
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Human readable description. Validation failures carry a list here.
    pub detail: serde_json::Value,
}

impl ApiErrorResponse {
    /// Flatten `detail` into a single message.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(entries) => entries
                .iter()
                .map(|entry| {
                    entry
                        .get("msg")
                        .and_then(serde_json::Value::as_str)
                        .map_or_else(|| entry.to_string(), str::to_string)
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
