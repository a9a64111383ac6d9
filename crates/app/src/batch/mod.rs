//! Batch orchestration over a rate-limited commerce API.
//!
//! # Features
//!
//! - Bounded worker pool (`buffer_unordered`) with input-ordered reports
//! - Per-entity stage machine recorded in the report
//! - Idempotency tag applied after a successful commit
//! - Shared pause on rate-limit signals
//! - Per-unit usage recording through a [`CompletionHook`]

mod orchestrator;
mod report;

use std::sync::atomic::{AtomicBool, Ordering};

use shelfwise_core::{ShopDomain, UsageCategory};
use uuid::Uuid;

use crate::billing::{Clock, UsageLedger, UsageRepository};

pub use orchestrator::{BatchRunner, BatchTransform, CompletionHook, HookError, NoHook, StepError};
pub use report::{BatchCounts, BatchEntry, BatchReport};

/// Records one usage unit for each optimized entity.
pub struct LedgerHook<'a, R, C> {
    ledger: &'a UsageLedger<R, C>,
    shop: &'a ShopDomain,
    category: UsageCategory,
    run_id: Uuid,
    missed: AtomicBool,
}

impl<'a, R, C> LedgerHook<'a, R, C> {
    /// Hook charging `category` for `shop`. `run_id` is stored in the
    /// usage event metadata.
    #[must_use]
    pub const fn new(
        ledger: &'a UsageLedger<R, C>,
        shop: &'a ShopDomain,
        category: UsageCategory,
        run_id: Uuid,
    ) -> Self {
        Self {
            ledger,
            shop,
            category,
            run_id,
            missed: AtomicBool::new(false),
        }
    }

    /// False once any optimized entity could not be charged.
    #[must_use]
    pub fn all_recorded(&self) -> bool {
        !self.missed.load(Ordering::SeqCst)
    }
}

impl<R: UsageRepository, C: Clock> CompletionHook for LedgerHook<'_, R, C> {
    async fn on_optimized(&self, entity_id: &str) -> Result<(), HookError> {
        let metadata = serde_json::json!({
            "entity_id": entity_id,
            "batch_id": self.run_id,
        });
        self.ledger
            .record_usage(self.shop, self.category, &metadata)
            .await
            .map(|_| ())
            .map_err(|e| {
                self.missed.store(true, Ordering::SeqCst);
                HookError(e.to_string())
            })
    }
}
