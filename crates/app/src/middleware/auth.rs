//! Session-token authentication extractor.
//!
//! Embedded-app requests carry `Authorization: Bearer <session token>`.
//! The extractor verifies the token, loads (or exchanges for) the shop's
//! offline access token and hands the handler a ready Admin API client.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use shelfwise_core::ShopDomain;

use crate::error::{AppError, set_sentry_user};
use crate::services::{AuthError, ShopAuthService};
use crate::shopify::AdminClient;
use crate::state::AppState;

/// An authenticated shop with its Admin API client.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(session: ShopSession) -> Result<Json<Value>, AppError> {
///     let shop = session.admin.shop_details().await?;
///     Ok(Json(json!({ "name": shop.name })))
/// }
/// ```
pub struct ShopSession {
    pub shop: ShopDomain,
    pub admin: AdminClient,
}

/// Bearer token from the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for ShopSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;

        let auth = ShopAuthService::new(state.pool(), state.http(), &state.config().shopify);
        let (shop, access_token) = auth.authenticate(token).await?;

        set_sentry_user(&shop);

        let admin = AdminClient::new(
            state.http().clone(),
            &shop,
            &state.config().shopify.api_version,
            access_token,
        );

        Ok(Self { shop, admin })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/usage");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
