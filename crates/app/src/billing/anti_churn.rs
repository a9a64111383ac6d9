//! Anti-churn guard.
//!
//! Remembers when a shop last uninstalled the app so a reinstall within the
//! lockout window cannot claim the free trial path again. The record is never
//! deleted on uninstall, and `trial_used` never reverts to false.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use shelfwise_core::ShopDomain;
use tracing::instrument;

use crate::db::RepositoryError;

use super::clock::Clock;

/// Length of the lockout window after an uninstall, in days.
pub const LOCKOUT_DAYS: i64 = 180;

/// Trial length offered to shops that never used one.
pub const TRIAL_DAYS: u32 = 7;

/// Stored anti-churn state of one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AntiChurnRecord {
    pub shop: ShopDomain,
    pub last_uninstalled: Option<DateTime<Utc>>,
    pub trial_used: bool,
}

/// Persistent storage for anti-churn records.
pub trait AntiChurnRepository: Send + Sync {
    /// Load the record for a shop.
    fn find(
        &self,
        shop: &ShopDomain,
    ) -> impl Future<Output = Result<Option<AntiChurnRecord>, RepositoryError>> + Send;

    /// Upsert `last_uninstalled = at` and `trial_used = true`.
    fn record_uninstall(
        &self,
        shop: &ShopDomain,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl<R: AntiChurnRepository + ?Sized> AntiChurnRepository for &R {
    fn find(
        &self,
        shop: &ShopDomain,
    ) -> impl Future<Output = Result<Option<AntiChurnRecord>, RepositoryError>> + Send {
        (**self).find(shop)
    }

    fn record_uninstall(
        &self,
        shop: &ShopDomain,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).record_uninstall(shop, at)
    }
}

/// Whether an uninstall at `last_uninstalled` still locks the shop at `now`.
///
/// The window is closed on both ends: `[now - 180 days, now]`. Timestamps in
/// the future are treated as not locking.
#[must_use]
pub fn is_within_lockout(last_uninstalled: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_uninstalled <= now && now - last_uninstalled <= TimeDelta::days(LOCKOUT_DAYS)
}

/// Lockout and trial decisions over an [`AntiChurnRepository`].
pub struct AntiChurnGuard<R, C> {
    repo: R,
    clock: C,
}

impl<R: AntiChurnRepository, C: Clock> AntiChurnGuard<R, C> {
    /// Create a guard over a repository and a time source.
    #[must_use]
    pub const fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Record an uninstall for `shop` at the current time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the upsert fails.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn on_uninstall(&self, shop: &ShopDomain) -> Result<(), RepositoryError> {
        let now = self.clock.now();
        self.repo.record_uninstall(shop, now).await?;
        tracing::info!(uninstalled_at = %now, "Anti-churn record updated");
        Ok(())
    }

    /// Whether the shop uninstalled within the lockout window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the record cannot be read.
    pub async fn is_locked(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let record = self.repo.find(shop).await?;
        let now = self.clock.now();
        Ok(record
            .and_then(|r| r.last_uninstalled)
            .is_some_and(|at| is_within_lockout(at, now)))
    }

    /// Whether the shop has already consumed its trial.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the record cannot be read.
    pub async fn has_used_trial(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        Ok(self.repo.find(shop).await?.is_some_and(|r| r.trial_used))
    }

    /// Trial days to offer on (re)install.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the record cannot be read.
    pub async fn trial_days(&self, shop: &ShopDomain) -> Result<u32, RepositoryError> {
        Ok(if self.has_used_trial(shop).await? {
            0
        } else {
            TRIAL_DAYS
        })
    }

    /// Lock and trial state in a single read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the record cannot be read.
    pub async fn status(&self, shop: &ShopDomain) -> Result<ChurnStatus, RepositoryError> {
        let record = self.repo.find(shop).await?;
        let now = self.clock.now();
        let trial_used = record.as_ref().is_some_and(|r| r.trial_used);
        let last_uninstalled = record.and_then(|r| r.last_uninstalled);

        Ok(ChurnStatus {
            locked: last_uninstalled.is_some_and(|at| is_within_lockout(at, now)),
            locked_until: last_uninstalled
                .filter(|at| is_within_lockout(*at, now))
                .map(|at| at + TimeDelta::days(LOCKOUT_DAYS)),
            trial_used,
            trial_days: if trial_used { 0 } else { TRIAL_DAYS },
        })
    }
}

/// Lock and trial state of a shop, as reported to the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChurnStatus {
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub trial_used: bool,
    pub trial_days: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_lockout_window_edges() {
        let now = now();
        assert!(is_within_lockout(now, now));
        assert!(is_within_lockout(now - TimeDelta::days(LOCKOUT_DAYS), now));
        assert!(is_within_lockout(now - TimeDelta::days(30), now));
        assert!(!is_within_lockout(
            now - TimeDelta::days(LOCKOUT_DAYS) - TimeDelta::seconds(1),
            now
        ));
    }

    #[test]
    fn test_future_uninstall_does_not_lock() {
        let now = now();
        assert!(!is_within_lockout(now + TimeDelta::seconds(1), now));
    }
}
