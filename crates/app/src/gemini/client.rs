//! Gemini API client for content generation.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` with the API key
//! in the `x-goog-api-key` header.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::config::GeminiConfig;

use super::ContentGenerator;
use super::error::{ApiErrorResponse, GeminiError};
use super::types::{GenerateContentRequest, GenerateContentResponse, GenerationRequest};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Gemini API client.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `config` - Gemini API configuration containing API key, model and base URL
    #[must_use]
    pub fn new(client: reqwest::Client, config: &GeminiConfig) -> Self {
        Self {
            inner: Arc::new(GeminiClientInner {
                client,
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Model ID used for every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.inner.base_url, self.inner.model
        )
    }

    /// Send a generation request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with an error status.
    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    pub async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let body = GenerateContentRequest::from(request);

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.inner.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        let text = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GeminiError::Parse(format!("Failed to parse response: {e}")))?;

        if let Some(usage) = parsed.usage_metadata {
            tracing::debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        Ok(parsed)
    }
}

impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeminiError> {
        let response = self.generate_content(request).await?;
        response_text(response)
    }
}

/// Extract the first candidate's text, mapping blocked or empty answers.
///
/// # Errors
///
/// Returns `GeminiError::Blocked` when the prompt was blocked or no text came back.
pub fn response_text(response: GenerateContentResponse) -> Result<String, GeminiError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(GeminiError::Blocked(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GeminiError::Blocked("no candidates returned".to_string()));
    };

    let text = candidate.content.map(|c| c.text()).unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty response".to_string());
        return Err(GeminiError::Blocked(reason));
    }

    Ok(text)
}

/// Handle an error status code.
async fn handle_error_status(status: reqwest::StatusCode, response: reqwest::Response) -> GeminiError {
    let header_retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return GeminiError::Http(e),
    };
    let api_error = serde_json::from_str::<ApiErrorResponse>(&body).ok();

    // Check for rate limiting
    let exhausted = api_error
        .as_ref()
        .is_some_and(|e| e.error.status == "RESOURCE_EXHAUSTED");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || exhausted {
        let retry_after = header_retry_after
            .or_else(|| api_error.as_ref().and_then(|e| e.error.retry_delay_secs()))
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return GeminiError::RateLimited(retry_after);
    }

    // Check for unauthorized
    let invalid_key = api_error.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.get("reason").and_then(serde_json::Value::as_str) == Some("API_KEY_INVALID"))
    });
    if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || invalid_key
    {
        return GeminiError::Unauthorized("Invalid API key".to_string());
    }

    match api_error {
        Some(api_error) => GeminiError::Api {
            status: api_error.error.status,
            message: api_error.error.message,
        },
        None => GeminiError::Api {
            status: status.as_u16().to_string(),
            message: body,
        },
    }
}
