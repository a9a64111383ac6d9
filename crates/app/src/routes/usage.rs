//! Usage overview for the embedded app's billing page.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use shelfwise_core::{Quota, UsagePeriod};

use crate::billing::{CategoryUsage, ChurnStatus, PlanResolver};
use crate::error::AppError;
use crate::middleware::ShopSession;
use crate::state::AppState;

/// The shop's current tier.
#[derive(Debug, Serialize)]
pub struct TierSummary {
    pub name: &'static str,
    pub monthly_price: Decimal,
    pub max_products_per_scan: Quota,
}

/// Response of `GET /api/usage`.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub shop: String,
    pub tier: TierSummary,
    /// `YYYY-MM` of the current period.
    pub period: String,
    pub usage: Vec<CategoryUsage>,
    pub anti_churn: ChurnStatus,
}

/// Tier, per-category usage, and lock and trial state.
pub async fn show(
    State(state): State<AppState>,
    session: ShopSession,
) -> Result<Json<UsageResponse>, AppError> {
    let tier = state.plans().resolve(&session.shop, &session.admin).await?;
    let ledger = state.ledger();
    let period: UsagePeriod = ledger.current_period();
    let usage = ledger.summary(&session.shop, tier).await?;
    let anti_churn = state
        .anti_churn()
        .status(&session.shop)
        .await
        .map_err(|e| AppError::Ledger(e.to_string()))?;

    Ok(Json(UsageResponse {
        shop: session.shop.into_inner(),
        tier: TierSummary {
            name: tier.name,
            monthly_price: tier.monthly_price,
            max_products_per_scan: tier.max_products_per_scan,
        },
        period: period.to_string(),
        usage,
        anti_churn,
    }))
}
