//! Anti-churn lockout window, trial eligibility and gate ordering.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use shelfwise_app::billing::anti_churn::{LOCKOUT_DAYS, TRIAL_DAYS};
use shelfwise_app::billing::{
    AntiChurnGuard, AntiChurnRecord, DenyReason, GateError, UsageLedger, authorize,
};
use shelfwise_core::{UsageCategory, catalog};
use shelfwise_integration_tests::{
    FixedClock, InMemoryAntiChurnRepository, InMemoryUsageRepository, test_shop,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap()
}

fn uninstalled_at(at: DateTime<Utc>) -> InMemoryAntiChurnRepository {
    let repo = InMemoryAntiChurnRepository::new();
    repo.insert(AntiChurnRecord {
        shop: test_shop(),
        last_uninstalled: Some(at),
        trial_used: true,
    });
    repo
}

// =============================================================================
// Lockout Window Tests
// =============================================================================

#[tokio::test]
async fn test_locked_inside_window() {
    let clock = FixedClock::new(now());
    let shop = test_shop();

    for offset in [
        TimeDelta::zero(),
        TimeDelta::seconds(1),
        TimeDelta::days(90),
        TimeDelta::days(LOCKOUT_DAYS),
    ] {
        let repo = uninstalled_at(now() - offset);
        let guard = AntiChurnGuard::new(&repo, &clock);
        assert!(guard.is_locked(&shop).await.unwrap(), "offset {offset}");
    }
}

#[tokio::test]
async fn test_unlocked_outside_window() {
    let clock = FixedClock::new(now());
    let shop = test_shop();

    let repo = uninstalled_at(now() - TimeDelta::days(LOCKOUT_DAYS) - TimeDelta::seconds(1));
    let guard = AntiChurnGuard::new(&repo, &clock);
    assert!(!guard.is_locked(&shop).await.unwrap());

    let repo = uninstalled_at(now() + TimeDelta::hours(1));
    let guard = AntiChurnGuard::new(&repo, &clock);
    assert!(!guard.is_locked(&shop).await.unwrap());

    let repo = InMemoryAntiChurnRepository::new();
    let guard = AntiChurnGuard::new(&repo, &clock);
    assert!(!guard.is_locked(&shop).await.unwrap());
}

#[tokio::test]
async fn test_lock_expires_as_clock_moves() {
    let repo = InMemoryAntiChurnRepository::new();
    let clock = FixedClock::new(now());
    let guard = AntiChurnGuard::new(&repo, &clock);
    let shop = test_shop();

    guard.on_uninstall(&shop).await.unwrap();
    assert!(guard.is_locked(&shop).await.unwrap());

    let status = guard.status(&shop).await.unwrap();
    assert!(status.locked);
    assert_eq!(status.locked_until, Some(now() + TimeDelta::days(LOCKOUT_DAYS)));

    clock.advance(TimeDelta::days(LOCKOUT_DAYS) + TimeDelta::seconds(1));
    assert!(!guard.is_locked(&shop).await.unwrap());
    assert_eq!(guard.status(&shop).await.unwrap().locked_until, None);
}

// =============================================================================
// Trial Tests
// =============================================================================

#[tokio::test]
async fn test_trial_offered_once() {
    let repo = InMemoryAntiChurnRepository::new();
    let clock = FixedClock::new(now());
    let guard = AntiChurnGuard::new(&repo, &clock);
    let shop = test_shop();

    assert!(!guard.has_used_trial(&shop).await.unwrap());
    assert_eq!(guard.trial_days(&shop).await.unwrap(), TRIAL_DAYS);

    guard.on_uninstall(&shop).await.unwrap();
    clock.advance(TimeDelta::days(365));

    // Lock is gone, but the trial stays consumed.
    assert!(!guard.is_locked(&shop).await.unwrap());
    assert!(guard.has_used_trial(&shop).await.unwrap());
    assert_eq!(guard.trial_days(&shop).await.unwrap(), 0);
}

// =============================================================================
// Gate Tests
// =============================================================================

#[tokio::test]
async fn test_gate_locks_trial_path_tier() {
    let usage = InMemoryUsageRepository::new();
    let churn = uninstalled_at(now() - TimeDelta::days(3));
    let clock = FixedClock::new(now());
    let ledger = UsageLedger::new(&usage, &clock);
    let guard = AntiChurnGuard::new(&churn, &clock);

    let result = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("free"),
        UsageCategory::Descriptions,
    )
    .await;
    assert!(matches!(result, Err(GateError::Locked)));
}

#[tokio::test]
async fn test_gate_ignores_lock_on_paid_tier() {
    let usage = InMemoryUsageRepository::new();
    let churn = uninstalled_at(now() - TimeDelta::days(3));
    let clock = FixedClock::new(now());
    let ledger = UsageLedger::new(&usage, &clock);
    let guard = AntiChurnGuard::new(&churn, &clock);

    let remaining = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("starter"),
        UsageCategory::Ads,
    )
    .await
    .unwrap();
    assert_eq!(remaining, Some(30));
}

#[tokio::test]
async fn test_gate_checks_lock_before_quota() {
    let usage = InMemoryUsageRepository::new();
    let churn = uninstalled_at(now() - TimeDelta::days(3));
    let clock = FixedClock::new(now());
    let ledger = UsageLedger::new(&usage, &clock);
    let guard = AntiChurnGuard::new(&churn, &clock);

    // Not entitled and locked: the lock wins.
    let result = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("free"),
        UsageCategory::Ads,
    )
    .await;
    assert!(matches!(result, Err(GateError::Locked)));

    // Unlocked free shop asking for ads is simply not entitled.
    let churn = InMemoryAntiChurnRepository::new();
    let guard = AntiChurnGuard::new(&churn, &clock);
    let result = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("free"),
        UsageCategory::Ads,
    )
    .await;
    assert!(matches!(
        result,
        Err(GateError::Denied(DenyReason::NotEntitled))
    ));
}

#[tokio::test]
async fn test_gate_surfaces_repository_failure() {
    let usage = InMemoryUsageRepository::new();
    let churn = InMemoryAntiChurnRepository::new();
    churn.set_failing(true);
    let clock = FixedClock::new(now());
    let ledger = UsageLedger::new(&usage, &clock);
    let guard = AntiChurnGuard::new(&churn, &clock);

    let result = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("free"),
        UsageCategory::Descriptions,
    )
    .await;
    assert!(matches!(result, Err(GateError::AntiChurn(_))));

    churn.set_failing(false);
    usage.set_failing(true);
    let result = authorize(
        &ledger,
        &guard,
        &test_shop(),
        catalog::resolve("free"),
        UsageCategory::Descriptions,
    )
    .await;
    assert!(matches!(result, Err(GateError::Ledger(_))));
}
