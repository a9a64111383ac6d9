//! Usage ledger behavior against the in-memory repository.
//!
//! Covers quota boundaries, month rollover, concurrent recording and the
//! split between denials and repository failures.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use shelfwise_app::billing::usage::decide;
use shelfwise_app::billing::{Clock, Decision, DenyReason, LedgerError, UsageLedger};
use shelfwise_core::{Quota, UsageCategory, UsagePeriod, catalog};
use shelfwise_integration_tests::{FixedClock, InMemoryUsageRepository, test_shop};

fn march() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap())
}

// =============================================================================
// Quota Boundary Tests
// =============================================================================

#[test]
fn test_quota_boundary_for_every_limit() {
    for limit in 0..=40u32 {
        for used in 0..u64::from(limit) {
            assert_eq!(
                decide(Quota::Limited(limit), used),
                Decision::Allowed {
                    remaining: Some(u64::from(limit) - used)
                },
                "limit {limit}, used {used}"
            );
        }
        assert_eq!(
            decide(Quota::Limited(limit), u64::from(limit)),
            Decision::Denied(DenyReason::QuotaExhausted {
                limit,
                used: u64::from(limit)
            }),
            "limit {limit} reached"
        );
    }
}

#[test]
fn test_unlimited_always_allowed() {
    for used in [0, 1, 1_000, u64::MAX] {
        assert_eq!(
            decide(Quota::Unlimited, used),
            Decision::Allowed { remaining: None }
        );
    }
}

#[tokio::test]
async fn test_free_descriptions_boundary_through_ledger() {
    let repo = InMemoryUsageRepository::new();
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();
    let free = catalog::resolve("free");

    for used in 0..3 {
        let decision = ledger
            .can_perform(&shop, free, UsageCategory::Descriptions)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allowed { remaining: Some(3 - used) });
        ledger
            .record_usage(&shop, UsageCategory::Descriptions, &serde_json::json!({}))
            .await
            .unwrap();
    }

    let decision = ledger
        .can_perform(&shop, free, UsageCategory::Descriptions)
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::Denied(DenyReason::QuotaExhausted { limit: 3, used: 3 })
    );
}

#[tokio::test]
async fn test_starter_ads_last_unit() {
    let repo = InMemoryUsageRepository::new();
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();
    let starter = catalog::resolve("starter");
    repo.seed(&shop, UsageCategory::Ads, ledger.current_period(), 29);

    let decision = ledger
        .can_perform(&shop, starter, UsageCategory::Ads)
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allowed { remaining: Some(1) });

    let count = ledger
        .record_usage(&shop, UsageCategory::Ads, &serde_json::json!({"entity_id": "p1"}))
        .await
        .unwrap();
    assert_eq!(count, 30);

    let decision = ledger
        .can_perform(&shop, starter, UsageCategory::Ads)
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::Denied(DenyReason::QuotaExhausted { limit: 30, used: 30 })
    );
}

// =============================================================================
// Entitlement Tests
// =============================================================================

#[tokio::test]
async fn test_not_entitled_never_reads_counter() {
    let repo = InMemoryUsageRepository::new();
    repo.set_failing(true);
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();

    let decision = ledger
        .can_perform(&shop, catalog::resolve("free"), UsageCategory::Ads)
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NotEntitled));

    let decision = ledger
        .can_perform(&shop, &catalog::RESTRICTED, UsageCategory::Descriptions)
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::NotEntitled));
}

#[tokio::test]
async fn test_unlimited_tier_skips_counter() {
    let repo = InMemoryUsageRepository::new();
    repo.set_failing(true);
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);

    let decision = ledger
        .can_perform(
            &test_shop(),
            catalog::resolve("enterprise"),
            UsageCategory::MusicVideos,
        )
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allowed { remaining: None });
}

// =============================================================================
// Period Tests
// =============================================================================

#[tokio::test]
async fn test_usage_does_not_carry_into_next_month() {
    let repo = InMemoryUsageRepository::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap());
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();
    let free = catalog::resolve("free");

    for _ in 0..3 {
        ledger
            .record_usage(&shop, UsageCategory::AltText, &serde_json::json!({}))
            .await
            .unwrap();
    }
    let march_period = ledger.current_period();
    assert!(
        !ledger
            .can_perform(&shop, free, UsageCategory::AltText)
            .await
            .unwrap()
            .is_allowed()
    );

    clock.advance(TimeDelta::seconds(1));
    let april_period = ledger.current_period();
    assert_eq!(april_period, march_period.next());
    assert_eq!(
        ledger
            .can_perform(&shop, free, UsageCategory::AltText)
            .await
            .unwrap(),
        Decision::Allowed { remaining: Some(3) }
    );

    // March is untouched by the rollover.
    assert_eq!(repo.count(&shop, UsageCategory::AltText, march_period), 3);
    assert_eq!(repo.count(&shop, UsageCategory::AltText, april_period), 0);
}

#[tokio::test]
async fn test_period_follows_clock_not_state() {
    let repo = InMemoryUsageRepository::new();
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);

    clock.set(Utc.with_ymd_and_hms(2026, 12, 31, 23, 0, 0).unwrap());
    let december = ledger.current_period();
    clock.set(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    let january = ledger.current_period();

    assert_eq!((december.year(), december.month()), (2026, 12));
    assert_eq!((january.year(), january.month()), (2027, 1));
    assert_eq!(january, UsagePeriod::containing(clock.now()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_concurrent_records_are_all_counted() {
    const CALLS: u64 = 50;

    let repo = InMemoryUsageRepository::with_delay(Duration::from_millis(10));
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();

    let calls = (0..CALLS).map(|i| {
        let ledger = &ledger;
        let shop = &shop;
        async move {
            ledger
                .record_usage(shop, UsageCategory::Ads, &serde_json::json!({ "entity_id": i }))
                .await
        }
    });
    let mut counts: Vec<u64> = futures::future::join_all(calls)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        repo.count(&shop, UsageCategory::Ads, ledger.current_period()),
        CALLS
    );
    counts.sort_unstable();
    assert_eq!(counts, (1..=CALLS).collect::<Vec<_>>());
    assert_eq!(repo.events().len(), 50);
}

#[tokio::test]
async fn test_record_units_adds_in_one_step() {
    let repo = InMemoryUsageRepository::new();
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();

    let count = ledger
        .record_units(&shop, UsageCategory::Ads, 4, &serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(repo.events().len(), 1);
}

// =============================================================================
// Failure and Summary Tests
// =============================================================================

#[tokio::test]
async fn test_repository_failure_is_not_a_denial() {
    let repo = InMemoryUsageRepository::new();
    repo.set_failing(true);
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();

    let result = ledger
        .can_perform(&shop, catalog::resolve("starter"), UsageCategory::Ads)
        .await;
    assert!(matches!(result, Err(LedgerError::Repository(_))));

    let result = ledger
        .record_usage(&shop, UsageCategory::Ads, &serde_json::json!({}))
        .await;
    assert!(matches!(result, Err(LedgerError::Repository(_))));
}

#[tokio::test]
async fn test_summary_reports_every_category() {
    let repo = InMemoryUsageRepository::new();
    let clock = march();
    let ledger = UsageLedger::new(&repo, &clock);
    let shop = test_shop();
    repo.seed(&shop, UsageCategory::Descriptions, ledger.current_period(), 2);

    let summary = ledger
        .summary(&shop, catalog::resolve("free"))
        .await
        .unwrap();
    assert_eq!(summary.len(), UsageCategory::ALL.len());

    let descriptions = summary
        .iter()
        .find(|u| u.category == UsageCategory::Descriptions)
        .unwrap();
    assert_eq!(descriptions.used, 2);
    assert_eq!(descriptions.limit, Some(3));
    assert_eq!(descriptions.remaining, Some(1));

    let ads = summary
        .iter()
        .find(|u| u.category == UsageCategory::Ads)
        .unwrap();
    assert!(!ads.entitled);
    assert_eq!(ads.remaining, Some(0));

    let remaining = ledger
        .remaining(&shop, catalog::resolve("enterprise"), UsageCategory::Ads)
        .await
        .unwrap();
    assert_eq!(remaining, None);
}
