//! Gemini integration for marketing copy generation.
//!
//! # Features
//!
//! - Free-text and JSON-schema-constrained generation
//! - Rate limits (`429`, `RESOURCE_EXHAUSTED`) reported separately from
//!   content and parse failures, with the server's retry delay
//! - Pipelines depend on the [`ContentGenerator`] trait, not the client

mod client;
mod error;
pub mod types;

use std::future::Future;

use serde::de::DeserializeOwned;

pub use client::{GeminiClient, response_text};
pub use error::{ApiError, ApiErrorResponse, GeminiError};
pub use types::GenerationRequest;

/// Generates text from a prompt.
pub trait ContentGenerator: Send + Sync {
    /// Generate free text for `request`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GeminiError>> + Send;

    /// Generate and parse a JSON answer.
    ///
    /// Tolerates a Markdown code fence around the JSON; anything else that
    /// does not parse as `T` is a `GeminiError::Parse`.
    fn generate_json<T>(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<T, GeminiError>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let text = self.generate(request).await?;
            serde_json::from_str(strip_code_fence(&text))
                .map_err(|e| GeminiError::Parse(format!("model returned invalid JSON: {e}")))
        }
    }
}

impl<G: ContentGenerator + ?Sized> ContentGenerator for &G {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GeminiError>> + Send {
        (**self).generate(request)
    }
}

/// Strip a surrounding ```` ```json ```` fence, if present.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
