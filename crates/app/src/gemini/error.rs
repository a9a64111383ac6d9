//! Error types for the Gemini API client.

use thiserror::Error;

/// Errors that can occur when interacting with the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gemini API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// Canonical status from the API, e.g. `INVALID_ARGUMENT`.
        status: String,
        /// Error message.
        message: String,
    },

    /// Rate limited or quota exhausted (`429` / `RESOURCE_EXHAUSTED`).
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The model answered, but not in the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The prompt or the candidate was blocked, or no candidate came back.
    #[error("no content generated: {0}")]
    Blocked(String),
}

impl GeminiError {
    /// Seconds to wait before retrying, when this is a rate-limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited(secs) => Some(*secs),
            _ => None,
        }
    }
}

/// API error response from Gemini.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Error body.
    pub error: ApiError,
}

/// Error body following `google.rpc.Status`.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// HTTP status code.
    #[serde(default)]
    pub code: u16,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Canonical status, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    pub status: String,
    /// Typed detail objects.
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl ApiError {
    /// The `retryDelay` of a `google.rpc.RetryInfo` detail, in whole seconds.
    #[must_use]
    pub fn retry_delay_secs(&self) -> Option<u64> {
        self.details
            .iter()
            .filter(|d| {
                d.get("@type")
                    .and_then(serde_json::Value::as_str)
                    .is_some_and(|t| t.ends_with("google.rpc.RetryInfo"))
            })
            .find_map(|d| d.get("retryDelay").and_then(serde_json::Value::as_str))
            .and_then(parse_duration_secs)
    }
}

/// Parse a protobuf JSON duration such as `"27s"` or `"1.5s"`, rounding up.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_duration_secs(value: &str) -> Option<u64> {
    let seconds = value.strip_suffix('s')?.parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(seconds.ceil() as u64)
}
