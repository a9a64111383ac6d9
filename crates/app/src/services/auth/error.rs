//! Shop authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur while authenticating an embedded-app request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("missing session token")]
    MissingToken,

    /// Signature, audience, issuer or expiry check failed.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// The token's `dest` claim is not a valid shop domain.
    #[error("invalid shop domain: {0}")]
    InvalidShop(#[from] shelfwise_core::ShopDomainError),

    /// Shopify refused or failed the token exchange.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(err.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::TokenExchange(err.to_string())
    }
}
