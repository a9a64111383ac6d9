//! Shop-level gate run before any AI work starts.
//!
//! Order: lockout (trial-path tiers only), then entitlement and quota.
//! Infrastructure failures surface as their own variants and are never
//! folded into allow or deny.

use shelfwise_core::{ShopDomain, TierDefinition, UsageCategory};
use thiserror::Error;

use crate::db::RepositoryError;

use super::anti_churn::{AntiChurnGuard, AntiChurnRepository};
use super::clock::Clock;
use super::usage::{Decision, DenyReason, LedgerError, UsageLedger, UsageRepository};

/// Reasons the gate refuses a request, or could not decide.
#[derive(Debug, Error)]
pub enum GateError {
    /// The shop reinstalled within the lockout window and is on the trial path.
    #[error("account locked after a recent uninstall")]
    Locked,

    /// Quota or entitlement refused the action.
    #[error("usage denied: {0:?}")]
    Denied(DenyReason),

    /// The usage ledger could not be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The anti-churn record could not be read.
    #[error("anti-churn repository error: {0}")]
    AntiChurn(#[source] RepositoryError),
}

/// Check lockout then quota for one category.
///
/// Returns the remaining allowance (`None` when unlimited).
///
/// # Errors
///
/// Returns `GateError::Locked` or `GateError::Denied` when the action is
/// refused, and the infrastructure variants when a repository fails.
pub async fn authorize<U, A, C1, C2>(
    ledger: &UsageLedger<U, C1>,
    guard: &AntiChurnGuard<A, C2>,
    shop: &ShopDomain,
    tier: &TierDefinition,
    category: UsageCategory,
) -> Result<Option<u64>, GateError>
where
    U: UsageRepository,
    A: AntiChurnRepository,
    C1: Clock,
    C2: Clock,
{
    if tier.trial_path && guard.is_locked(shop).await.map_err(GateError::AntiChurn)? {
        tracing::warn!(shop = %shop, tier = tier.name, "Gated action refused: account locked");
        return Err(GateError::Locked);
    }

    match ledger.can_perform(shop, tier, category).await? {
        Decision::Allowed { remaining } => Ok(remaining),
        Decision::Denied(reason) => {
            tracing::info!(shop = %shop, tier = tier.name, %category, ?reason, "Gated action refused");
            Err(GateError::Denied(reason))
        }
    }
}
