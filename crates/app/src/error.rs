//! Unified error handling for the HTTP layer.
//!
//! Every error renders as `{"error": <code>, "message": <text>}`. Internal
//! details (database, upstream payloads) are never echoed to clients.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use shelfwise_core::ShopDomain;
use thiserror::Error;

use crate::billing::{DenyReason, GateError, LedgerError};
use crate::db::RepositoryError;
use crate::gemini::GeminiError;
use crate::services::{AuthError, PipelineError};
use crate::shopify::AdminShopifyError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Usage ledger or anti-churn store unavailable.
    #[error("Usage store error: {0}")]
    Ledger(String),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Gemini API operation failed.
    #[error("Gemini error: {0}")]
    Gemini(#[from] GeminiError),

    /// Quota exhausted or feature not in the plan.
    #[error("Upgrade required: {0:?}")]
    QuotaDenied(DenyReason),

    /// Reinstalled within the anti-churn window on the trial tier.
    #[error("Account locked")]
    Locked,

    /// Upstream asked us to slow down.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shopify(AdminShopifyError::RateLimited(_))
            | Self::Gemini(GeminiError::RateLimited(_))
            | Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Shopify(_) | Self::Gemini(_) => StatusCode::BAD_GATEWAY,
            Self::QuotaDenied(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Locked => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::Internal(_) => "internal_error",
            Self::Ledger(_) => "service_unavailable",
            Self::Shopify(AdminShopifyError::RateLimited(_))
            | Self::Gemini(GeminiError::RateLimited(_))
            | Self::RateLimited(_) => "rate_limited",
            Self::Shopify(_) | Self::Gemini(_) => "upstream_error",
            Self::QuotaDenied(DenyReason::QuotaExhausted { .. }) => "quota_exhausted",
            Self::QuotaDenied(DenyReason::NotEntitled) => "feature_not_entitled",
            Self::Locked => "account_locked",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited(secs) => Some(*secs),
            Self::Shopify(e) => e.retry_after(),
            Self::Gemini(e) => e.retry_after(),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Ledger(_) => "Usage tracking is temporarily unavailable".to_string(),
            Self::Shopify(_) | Self::Gemini(_) if self.retry_after().is_some() => {
                "Too many requests, try again shortly".to_string()
            }
            Self::Shopify(_) | Self::Gemini(_) => "External service error".to_string(),
            Self::QuotaDenied(DenyReason::QuotaExhausted { limit, used }) => format!(
                "Monthly limit reached ({used}/{limit}). Upgrade your plan to continue."
            ),
            Self::QuotaDenied(DenyReason::NotEntitled) => {
                "This feature is not included in your plan. Upgrade required.".to_string()
            }
            Self::Locked => {
                "This store recently uninstalled the app and is not eligible for the free plan."
                    .to_string()
            }
            Self::RateLimited(_) => "Too many requests, try again shortly".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.public_message(),
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = self.retry_after() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Locked => Self::Locked,
            GateError::Denied(reason) => Self::QuotaDenied(reason),
            GateError::Ledger(e) => Self::from(e),
            GateError::AntiChurn(e) => Self::Ledger(e.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Gate(e) => Self::from(e),
            PipelineError::Shopify(e) => Self::Shopify(e),
            PipelineError::ProductNotFound(id) => Self::NotFound(format!("product {id}")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Repository(e) => Self::Database(e),
            AuthError::TokenExchange(e) => {
                tracing::warn!(error = %e, "Token exchange failed");
                Self::Unauthorized("session could not be established".to_string())
            }
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

/// Set the Sentry user context to the authenticated shop.
pub fn set_sentry_user(shop: &ShopDomain) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(shop.as_str().to_string()),
            username: Some(shop.handle().to_string()),
            ..Default::default()
        }));
    });
}
