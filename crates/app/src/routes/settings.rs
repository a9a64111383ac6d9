//! Per-shop prompt settings.

use axum::{Json, extract::State};

use crate::db::ShopSettingsRepository;
use crate::error::AppError;
use crate::middleware::ShopSession;
use crate::models::{SettingsUpdate, ShopSettings};
use crate::state::AppState;

/// Current settings, defaults when none are stored.
pub async fn show(
    State(state): State<AppState>,
    session: ShopSession,
) -> Result<Json<ShopSettings>, AppError> {
    let settings = ShopSettingsRepository::new(state.pool())
        .get(&session.shop)
        .await?;
    Ok(Json(settings))
}

/// Apply a partial update and return the stored settings.
pub async fn update(
    State(state): State<AppState>,
    session: ShopSession,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<ShopSettings>, AppError> {
    let repo = ShopSettingsRepository::new(state.pool());
    let settings = repo
        .get(&session.shop)
        .await?
        .merge(update)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    repo.upsert(&session.shop, &settings).await?;
    tracing::info!(shop = %session.shop, "Shop settings updated");

    Ok(Json(settings))
}
