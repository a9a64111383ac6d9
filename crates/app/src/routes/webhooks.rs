//! Shopify webhooks.
//!
//! Webhooks are authenticated by an HMAC-SHA256 of the raw body with the app
//! secret, sent base64-encoded in `X-Shopify-Hmac-Sha256`.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use shelfwise_core::ShopDomain;

use crate::billing::PlanResolver;
use crate::db::ShopSessionRepository;
use crate::error::AppError;
use crate::services::auth::verify_webhook_hmac;
use crate::state::AppState;

/// Header carrying the base64 HMAC of the body.
pub const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

/// Header naming the shop the webhook is about.
pub const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `POST /webhooks/app/uninstalled`
///
/// Starts the anti-churn lockout, drops the stored access token (it is
/// revoked on uninstall) and forgets the cached tier.
pub async fn app_uninstalled(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = header(&headers, HMAC_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;
    if !verify_webhook_hmac(&state.config().shopify.api_secret, &body, signature) {
        tracing::warn!("Rejected webhook with invalid HMAC");
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let shop = header(&headers, SHOP_HEADER)
        .ok_or_else(|| AppError::BadRequest(format!("missing {SHOP_HEADER} header")))
        .and_then(|s| {
            ShopDomain::parse(s).map_err(|e| AppError::BadRequest(e.to_string()))
        })?;

    state
        .anti_churn()
        .on_uninstall(&shop)
        .await
        .map_err(|e| AppError::Ledger(e.to_string()))?;
    let deleted = ShopSessionRepository::new(state.pool()).delete(&shop).await?;
    state.plans().invalidate(&shop).await;

    tracing::info!(shop = %shop, session_deleted = deleted, "App uninstalled");
    Ok(StatusCode::OK)
}
