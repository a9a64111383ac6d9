//! Shopify Admin API client.
//!
//! # Architecture
//!
//! - One [`AdminClient`] per shop and request, built from the shop's offline
//!   access token
//! - Operations implement `graphql_client::GraphQLQuery` and run through a
//!   single generic `execute`
//! - Throttling (HTTP 429 or a `THROTTLED` GraphQL error) surfaces as
//!   [`AdminShopifyError::RateLimited`]
//! - Pipelines depend on the narrow [`CommerceAdmin`] trait, not the client
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfwise_app::shopify::{AdminClient, CommerceAdmin};
//!
//! let client = AdminClient::new(http, &shop, "2025-10", access_token);
//!
//! let untagged = client.products_without_tag("ai-optimized", 50).await?;
//! client.add_tags(&untagged[0].id, &["ai-optimized".to_string()]).await?;
//! ```

mod admin;
mod commerce;
pub mod types;

pub use admin::AdminClient;
pub use commerce::CommerceAdmin;
pub use types::*;

use thiserror::Error;

/// Seconds to pause after a `THROTTLED` GraphQL error, which carries no
/// `Retry-After` header.
pub const THROTTLED_RETRY_SECS: u64 = 2;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl AdminShopifyError {
    /// Seconds to wait before retrying, when this is a throttling error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited(secs) => Some(*secs),
            _ => None,
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
    /// `extensions.code`, e.g. `THROTTLED`.
    pub code: Option<String>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_shopify_error_display() {
        let err = AdminShopifyError::NotFound("gid://shopify/Product/1".to_string());
        assert_eq!(err.to_string(), "Not found: gid://shopify/Product/1");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                locations: vec![],
                path: vec![],
                code: None,
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                locations: vec![],
                path: vec![],
                code: None,
            },
        ];
        let err = AdminShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AdminShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
        assert_eq!(err.retry_after(), Some(60));
        assert_eq!(
            AdminShopifyError::UserError("x".to_string()).retry_after(),
            None
        );
    }
}
