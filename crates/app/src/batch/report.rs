//! Per-run batch report.

use serde::Serialize;
use shelfwise_core::{BatchOutcome, ItemStage};
use uuid::Uuid;

/// Result for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub entity_id: String,
    pub outcome: BatchOutcome,
    /// Last stage the entity reached.
    pub stage: ItemStage,
    /// Short description of what was written, once committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    /// An entity excluded before entering the pipeline.
    #[must_use]
    pub fn skipped(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            outcome: BatchOutcome::Skipped,
            stage: ItemStage::Pending,
            patch_summary: None,
            error: Some(reason.into()),
        }
    }
}

/// Aggregate counts. `optimized + failed + skipped` equals the number of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub optimized: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchCounts {
    fn tally(entries: &[BatchEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut counts, entry| {
            match entry.outcome {
                BatchOutcome::Optimized => counts.optimized += 1,
                BatchOutcome::Failed => counts.failed += 1,
                BatchOutcome::Skipped => counts.skipped += 1,
            }
            counts
        })
    }

    /// Total entities reported.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.optimized + self.failed + self.skipped
    }
}

/// Summary of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// Idempotency tag applied to optimized entities.
    pub tag: String,
    /// Entries in input order.
    pub entries: Vec<BatchEntry>,
    pub counts: BatchCounts,
    /// Entities never started because the run was aborted.
    pub aborted: Vec<String>,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Build a report, computing counts from `entries`.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        tag: impl Into<String>,
        entries: Vec<BatchEntry>,
        aborted: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        let counts = BatchCounts::tally(&entries);
        Self {
            run_id,
            tag: tag.into(),
            entries,
            counts,
            aborted,
            duration_ms,
        }
    }

    /// Append entries for entities excluded before the run started.
    pub fn push_skipped(&mut self, skipped: impl IntoIterator<Item = BatchEntry>) {
        self.entries.extend(skipped);
        self.counts = BatchCounts::tally(&self.entries);
    }

    /// Entry for `entity_id`, if reported.
    #[must_use]
    pub fn entry(&self, entity_id: &str) -> Option<&BatchEntry> {
        self.entries.iter().find(|e| e.entity_id == entity_id)
    }

    /// Whether the run stopped scheduling entities early.
    #[must_use]
    pub fn was_aborted(&self) -> bool {
        !self.aborted.is_empty()
    }
}
