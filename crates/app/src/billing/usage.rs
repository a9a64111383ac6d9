//! Usage ledger: monthly quota checks and consumption recording.
//!
//! Counters are keyed by `(shop, category, period)` where the period is the
//! UTC calendar month of the injected clock. A new month is a new key, so no
//! reset job exists. Increments go through the repository's atomic add; the
//! ledger never reads, modifies and writes a counter itself.

use std::future::Future;

use serde::Serialize;
use shelfwise_core::{BillingModel, Quota, ShopDomain, TierDefinition, UsageCategory, UsagePeriod};
use thiserror::Error;
use tracing::instrument;

use crate::db::RepositoryError;

use super::clock::Clock;

/// Persistent storage for usage counters.
pub trait UsageRepository: Send + Sync {
    /// Current count for the key, zero when no row exists.
    fn current_count(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Atomically add `units` to the key and return the new count.
    fn add(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
        units: u32,
        metadata: &serde_json::Value,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

impl<R: UsageRepository + ?Sized> UsageRepository for &R {
    fn current_count(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send {
        (**self).current_count(shop, category, period)
    }

    fn add(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
        units: u32,
        metadata: &serde_json::Value,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send {
        (**self).add(shop, category, period, units, metadata)
    }
}

/// Errors from the usage ledger. Always infrastructure, never a denial.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The usage repository failed.
    #[error("usage repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Why a gated action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// The tier does not enable the category's feature.
    NotEntitled,
    /// The monthly allowance is used up.
    QuotaExhausted {
        /// Monthly limit of the tier.
        limit: u32,
        /// Units consumed this period.
        used: u64,
    },
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed. `remaining` is `None` when unlimited.
    Allowed {
        /// Units left this period, before the action runs.
        remaining: Option<u64>,
    },
    /// The action is refused.
    Denied(DenyReason),
}

impl Decision {
    /// Whether the action may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Usage of one category in the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub category: UsageCategory,
    pub billing: BillingModel,
    pub entitled: bool,
    pub used: u64,
    /// `None` when unlimited.
    pub limit: Option<u32>,
    /// `None` when unlimited.
    pub remaining: Option<u64>,
}

/// Per-shop usage ledger over a [`UsageRepository`].
pub struct UsageLedger<R, C> {
    repo: R,
    clock: C,
}

impl<R: UsageRepository, C: Clock> UsageLedger<R, C> {
    /// Create a ledger over a repository and a time source.
    #[must_use]
    pub const fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Period the clock currently falls in.
    #[must_use]
    pub fn current_period(&self) -> UsagePeriod {
        UsagePeriod::containing(self.clock.now())
    }

    /// Decide whether `shop` on `tier` may consume one unit of `category`.
    ///
    /// Entitlement is checked before the counter is read, so a shop that is
    /// not entitled never touches the store.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the counter cannot be read.
    #[instrument(skip(self, tier), fields(shop = %shop, tier = tier.name, category = %category))]
    pub async fn can_perform(
        &self,
        shop: &ShopDomain,
        tier: &TierDefinition,
        category: UsageCategory,
    ) -> Result<Decision, LedgerError> {
        if !tier.is_entitled(category) {
            return Ok(Decision::Denied(DenyReason::NotEntitled));
        }

        let quota = tier.quota_for(category);
        if quota == Quota::Unlimited {
            return Ok(Decision::Allowed { remaining: None });
        }

        let used = self
            .repo
            .current_count(shop, category, self.current_period())
            .await?;
        Ok(decide(quota, used))
    }

    /// Units left for `category` this period; `None` when unlimited.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the counter cannot be read.
    pub async fn remaining(
        &self,
        shop: &ShopDomain,
        tier: &TierDefinition,
        category: UsageCategory,
    ) -> Result<Option<u64>, LedgerError> {
        if !tier.is_entitled(category) {
            return Ok(Some(0));
        }
        let quota = tier.quota_for(category);
        if quota == Quota::Unlimited {
            return Ok(None);
        }
        let used = self
            .repo
            .current_count(shop, category, self.current_period())
            .await?;
        Ok(quota.remaining(used))
    }

    /// Record one unit of consumption. Returns the new period count.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the increment fails.
    pub async fn record_usage(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        metadata: &serde_json::Value,
    ) -> Result<u64, LedgerError> {
        self.record_units(shop, category, 1, metadata).await
    }

    /// Record `units` of consumption in one atomic add.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the increment fails.
    #[instrument(skip(self, metadata), fields(shop = %shop, category = %category))]
    pub async fn record_units(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        units: u32,
        metadata: &serde_json::Value,
    ) -> Result<u64, LedgerError> {
        let period = self.current_period();
        let count = self
            .repo
            .add(shop, category, period, units, metadata)
            .await?;
        tracing::info!(%period, units, count, "Usage recorded");
        Ok(count)
    }

    /// Usage of every category for the current period.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if any counter cannot be read.
    pub async fn summary(
        &self,
        shop: &ShopDomain,
        tier: &TierDefinition,
    ) -> Result<Vec<CategoryUsage>, LedgerError> {
        let period = self.current_period();
        let mut usage = Vec::with_capacity(UsageCategory::ALL.len());

        for category in UsageCategory::ALL {
            let used = self.repo.current_count(shop, category, period).await?;
            let entitled = tier.is_entitled(category);
            let quota = tier.quota_for(category);
            usage.push(CategoryUsage {
                category,
                billing: category.billing_model(),
                entitled,
                used,
                limit: quota.limit(),
                remaining: if entitled {
                    quota.remaining(used)
                } else {
                    Some(0)
                },
            });
        }

        Ok(usage)
    }
}

/// Compare a period count against an entitled quota.
#[must_use]
pub fn decide(quota: Quota, used: u64) -> Decision {
    match quota {
        Quota::Unlimited => Decision::Allowed { remaining: None },
        Quota::Limited(limit) if quota.allows(used) => Decision::Allowed {
            remaining: Some(u64::from(limit) - used),
        },
        Quota::Limited(limit) => Decision::Denied(DenyReason::QuotaExhausted { limit, used }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_boundary() {
        for limit in [0_u32, 1, 3, 30] {
            for used in 0..u64::from(limit) {
                assert!(decide(Quota::Limited(limit), used).is_allowed());
            }
            assert_eq!(
                decide(Quota::Limited(limit), u64::from(limit)),
                Decision::Denied(DenyReason::QuotaExhausted {
                    limit,
                    used: u64::from(limit)
                })
            );
        }
    }

    #[test]
    fn test_decide_remaining() {
        assert_eq!(
            decide(Quota::Limited(30), 29),
            Decision::Allowed { remaining: Some(1) }
        );
        assert_eq!(
            decide(Quota::Unlimited, 1_000_000),
            Decision::Allowed { remaining: None }
        );
    }

    #[test]
    fn test_deny_reason_serialization() {
        let json = serde_json::to_value(DenyReason::QuotaExhausted { limit: 3, used: 3 })
            .unwrap_or_default();
        assert_eq!(json["reason"], "quota_exhausted");
        assert_eq!(json["limit"], 3);

        let json = serde_json::to_value(DenyReason::NotEntitled).unwrap_or_default();
        assert_eq!(json["reason"], "not_entitled");
    }
}
