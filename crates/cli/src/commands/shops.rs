//! Tier catalog and per-shop support commands.

use shelfwise_app::billing::{AntiChurnGuard, AntiChurnRepository, SystemClock, UsageLedger};
use shelfwise_app::db::{PgAntiChurnRepository, PgUsageRepository};
use shelfwise_core::{Quota, ShopDomain, UsageCategory, catalog};

use super::{CommandError, connect};

fn quota_label(quota: Quota) -> String {
    quota
        .limit()
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
}

/// Print every tier with its price, scan size and quotas.
pub fn tiers() {
    for tier in &catalog::TIERS {
        let quotas = UsageCategory::ALL
            .iter()
            .map(|&category| {
                let quota = if tier.is_entitled(category) {
                    quota_label(tier.quota_for(category))
                } else {
                    "-".to_string()
                };
                format!("{category}={quota}")
            })
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!(
            "{:<13} ${:>7}/mo  scan={:<9} {}",
            tier.name,
            tier.monthly_price.to_string(),
            quota_label(tier.max_products_per_scan),
            quotas
        );
    }
}

/// Print a shop's counters for the current month and its anti-churn state.
///
/// # Errors
///
/// Returns `CommandError` if the shop is invalid or the database query fails.
pub async fn usage(shop: &str) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop)?;
    let pool = connect().await?;

    let period = UsageLedger::new(PgUsageRepository::new(&pool), SystemClock).current_period();
    let counts = PgUsageRepository::new(&pool)
        .counts_for_period(&shop, period)
        .await?;

    tracing::info!("Usage for {shop} in {period}:");
    for category in UsageCategory::ALL {
        let count = counts
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, n)| *n);
        tracing::info!("  {category:<13} {count}");
    }

    let status = AntiChurnGuard::new(PgAntiChurnRepository::new(&pool), SystemClock)
        .status(&shop)
        .await?;
    tracing::info!(
        "  locked={} trial_used={} trial_days={}",
        status.locked,
        status.trial_used,
        status.trial_days
    );

    Ok(())
}

/// Clear `last_uninstalled` for a shop so it is no longer locked.
///
/// # Errors
///
/// Returns `CommandError` if the shop is invalid or the database query fails.
pub async fn unlock(shop: &str) -> Result<(), CommandError> {
    let shop = ShopDomain::parse(shop)?;
    let pool = connect().await?;
    let repo = PgAntiChurnRepository::new(&pool);

    if repo.find(&shop).await?.is_none() {
        tracing::warn!("No anti-churn record for {shop}, nothing to unlock");
        return Ok(());
    }

    repo.clear_lockout(&shop).await?;
    tracing::info!("Lockout cleared for {shop} (trial flag kept)");
    Ok(())
}
