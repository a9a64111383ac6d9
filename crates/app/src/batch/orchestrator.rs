//! Bounded-concurrency generate → commit → tag runner.
//!
//! Entities run through [`BatchTransform`] with at most `concurrency` in
//! flight. A failing entity never stops the run; it is reported as `failed`
//! and stays eligible for the next selection because it was never tagged.
//!
//! Tagging is a separate mutation from the content update. A crash between
//! the two leaves committed but untagged content, which the next run
//! reprocesses.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::StreamExt;
use shelfwise_core::{BatchOutcome, ItemStage};
use thiserror::Error;
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::gemini::GeminiError;
use crate::shopify::AdminShopifyError;

use super::report::{BatchEntry, BatchReport};

/// Failure of one pipeline step for one entity.
#[derive(Debug, Error)]
pub enum StepError {
    /// Content could not be generated or did not validate.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The commerce platform rejected the write.
    #[error("commit failed: {0}")]
    Commit(String),

    /// An upstream API asked us to slow down.
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
}

impl StepError {
    /// Wrap a generation-side error, keeping rate limits distinct.
    #[must_use]
    pub fn generation(err: GeminiError) -> Self {
        match err.retry_after() {
            Some(secs) => Self::RateLimited {
                retry_after: Duration::from_secs(secs),
            },
            None => Self::Generation(err.to_string()),
        }
    }

    /// Wrap a commerce-side error, keeping rate limits distinct.
    #[must_use]
    pub fn commit(err: AdminShopifyError) -> Self {
        match err.retry_after() {
            Some(secs) => Self::RateLimited {
                retry_after: Duration::from_secs(secs),
            },
            None => Self::Commit(err.to_string()),
        }
    }
}

/// Infrastructure failure from a completion hook; aborts the rest of the run.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(pub String);

/// The three steps applied to every entity of a batch.
pub trait BatchTransform: Send + Sync {
    /// Input item, e.g. a product snapshot.
    type Entity: Send + Sync;
    /// Generated content awaiting commit.
    type Patch: Send;

    /// Stable identifier reported for the entity.
    fn entity_id(entity: &Self::Entity) -> &str;

    /// Produce content for the entity.
    fn generate(
        &self,
        entity: &Self::Entity,
    ) -> impl Future<Output = Result<Self::Patch, StepError>> + Send;

    /// Write the patch back. Returns a short summary for the report.
    fn commit(
        &self,
        entity: &Self::Entity,
        patch: Self::Patch,
    ) -> impl Future<Output = Result<String, StepError>> + Send;

    /// Mark the entity done so later selections skip it.
    fn apply_tag(
        &self,
        entity: &Self::Entity,
        tag: &str,
    ) -> impl Future<Output = Result<(), StepError>> + Send;
}

/// Called once per entity that reached `tagged`.
pub trait CompletionHook: Send + Sync {
    /// Runs after the tag is applied. An error aborts unscheduled entities.
    fn on_optimized(&self, entity_id: &str) -> impl Future<Output = Result<(), HookError>> + Send;
}

/// Hook that does nothing (per-batch billing, or tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl CompletionHook for NoHook {
    fn on_optimized(&self, _entity_id: &str) -> impl Future<Output = Result<(), HookError>> + Send {
        std::future::ready(Ok(()))
    }
}

/// Shared pause installed by rate-limit signals.
struct Throttle {
    until: Mutex<Option<tokio::time::Instant>>,
    max_backoff: Duration,
}

impl Throttle {
    const fn new(max_backoff: Duration) -> Self {
        Self {
            until: Mutex::new(None),
            max_backoff,
        }
    }

    /// Push the pause out to `now + min(retry_after, max_backoff)`.
    fn signal(&self, retry_after: Duration) {
        let resume = tokio::time::Instant::now() + retry_after.min(self.max_backoff);
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        if until.is_none_or(|current| current < resume) {
            *until = Some(resume);
        }
    }

    /// Sleep until no pause is pending. A pause extended while sleeping is
    /// honoured.
    async fn wait(&self) {
        loop {
            let until = *self.until.lock().unwrap_or_else(PoisonError::into_inner);
            match until {
                Some(until) if tokio::time::Instant::now() < until => {
                    tokio::time::sleep_until(until).await;
                }
                _ => return,
            }
        }
    }
}

/// Runs batches with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: usize,
    max_backoff: Duration,
}

impl BatchRunner {
    /// Create a runner from configuration.
    #[must_use]
    pub fn new(config: BatchConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_backoff: config.max_backoff,
        }
    }

    /// Entities processed at once.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every entity through `transform` and tag the ones that succeed.
    ///
    /// Entities must already be filtered on "not tagged `tag`". Entity-level
    /// failures are contained in the report; only a [`HookError`] stops new
    /// entities from starting.
    pub async fn run<T, H>(
        &self,
        entities: Vec<T::Entity>,
        transform: &T,
        tag: &str,
        hook: &H,
    ) -> BatchReport
    where
        T: BatchTransform,
        H: CompletionHook,
    {
        self.run_with_id(Uuid::new_v4(), entities, transform, tag, hook)
            .await
    }

    /// [`Self::run`] under a caller-chosen run id, so hooks can reference it.
    #[instrument(skip_all, fields(run_id = %run_id, tag = %tag, entities = entities.len()))]
    pub async fn run_with_id<T, H>(
        &self,
        run_id: Uuid,
        entities: Vec<T::Entity>,
        transform: &T,
        tag: &str,
        hook: &H,
    ) -> BatchReport
    where
        T: BatchTransform,
        H: CompletionHook,
    {
        let started = Instant::now();

        let abort_flag = AtomicBool::new(false);
        let throttle_gate = Throttle::new(self.max_backoff);

        let mut slots: Vec<Option<BatchEntry>> = Vec::new();
        slots.resize_with(entities.len(), || None);

        let abort = &abort_flag;
        let throttle = &throttle_gate;
        let pending: Vec<_> = entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                async move {
                    if abort.load(Ordering::SeqCst) {
                        return (index, None);
                    }
                    throttle.wait().await;
                    if abort.load(Ordering::SeqCst) {
                        return (index, None);
                    }
                    let entry = process(entity, transform, tag, hook, throttle, abort).await;
                    (index, Some(entry))
                }
                .in_current_span()
            })
            .collect();
        let mut results = futures::stream::iter(pending).buffer_unordered(self.concurrency);

        while let Some((index, entry)) = results.next().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = entry;
            }
        }
        drop(results);

        let mut entries = Vec::with_capacity(entities.len());
        let mut aborted = Vec::new();
        for (entity, slot) in entities.iter().zip(slots) {
            match slot {
                Some(entry) => entries.push(entry),
                None => aborted.push(T::entity_id(entity).to_string()),
            }
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = BatchReport::new(run_id, tag, entries, aborted, duration_ms);

        tracing::info!(
            optimized = report.counts.optimized,
            failed = report.counts.failed,
            aborted = report.aborted.len(),
            duration_ms,
            "Batch run finished"
        );

        report
    }
}

/// Drive one entity through the stage machine.
async fn process<T, H>(
    entity: &T::Entity,
    transform: &T,
    tag: &str,
    hook: &H,
    throttle: &Throttle,
    abort: &AtomicBool,
) -> BatchEntry
where
    T: BatchTransform,
    H: CompletionHook,
{
    let entity_id = T::entity_id(entity);
    let mut entry = BatchEntry {
        entity_id: entity_id.to_string(),
        outcome: BatchOutcome::Failed,
        stage: ItemStage::Pending,
        patch_summary: None,
        error: None,
    };

    advance(&mut entry, ItemStage::Generating);
    let patch = match transform.generate(entity).await {
        Ok(patch) => patch,
        Err(err) => {
            fail(&mut entry, ItemStage::GenerationFailed, &err, throttle);
            return entry;
        }
    };
    advance(&mut entry, ItemStage::Generated);

    advance(&mut entry, ItemStage::Committing);
    match transform.commit(entity, patch).await {
        Ok(summary) => entry.patch_summary = Some(summary),
        Err(err) => {
            fail(&mut entry, ItemStage::CommitFailed, &err, throttle);
            return entry;
        }
    }

    if let Err(err) = transform.apply_tag(entity, tag).await {
        fail(&mut entry, ItemStage::CommitFailed, &err, throttle);
        entry.error = Some(format!("content saved but tagging failed: {err}"));
        return entry;
    }
    advance(&mut entry, ItemStage::Tagged);
    entry.outcome = BatchOutcome::Optimized;

    if let Err(err) = hook.on_optimized(entity_id).await {
        abort.store(true, Ordering::SeqCst);
        tracing::error!(entity_id, error = %err, "Completion hook failed, aborting run");
        entry.error = Some(format!("usage not recorded: {err}"));
    }

    entry
}

fn advance(entry: &mut BatchEntry, next: ItemStage) {
    debug_assert!(
        entry.stage.can_advance_to(next),
        "illegal stage transition {:?} -> {next:?}",
        entry.stage
    );
    entry.stage = next;
}

fn fail(entry: &mut BatchEntry, stage: ItemStage, err: &StepError, throttle: &Throttle) {
    if let StepError::RateLimited { retry_after } = err {
        throttle.signal(*retry_after);
    }
    tracing::warn!(entity_id = %entry.entity_id, ?stage, error = %err, "Batch entity failed");
    advance(entry, stage);
    entry.outcome = BatchOutcome::Failed;
    entry.error = Some(err.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_keeps_rate_limits_distinct() {
        let err = StepError::generation(GeminiError::RateLimited(12));
        assert!(matches!(
            err,
            StepError::RateLimited { retry_after } if retry_after == Duration::from_secs(12)
        ));

        let err = StepError::generation(GeminiError::Parse("bad json".to_string()));
        assert!(matches!(err, StepError::Generation(_)));

        let err = StepError::commit(AdminShopifyError::RateLimited(2));
        assert!(matches!(err, StepError::RateLimited { .. }));

        let err = StepError::commit(AdminShopifyError::UserError("title blank".to_string()));
        assert_eq!(err.to_string(), "commit failed: User error: title blank");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_caps_pause_at_max_backoff() {
        let throttle = Throttle::new(Duration::from_secs(5));
        throttle.signal(Duration::from_secs(60));

        let before = tokio::time::Instant::now();
        throttle.wait().await;
        assert_eq!(before.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_honours_pause_extended_while_waiting() {
        let throttle = Throttle::new(Duration::from_secs(30));
        throttle.signal(Duration::from_secs(2));

        let before = tokio::time::Instant::now();
        let waiter = async {
            throttle.wait().await;
            before.elapsed()
        };
        let extender = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            throttle.signal(Duration::from_secs(10));
        };
        let (waited, ()) = tokio::join!(waiter, extender);
        assert_eq!(waited, Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_keeps_longest_pause() {
        let throttle = Throttle::new(Duration::from_secs(30));
        throttle.signal(Duration::from_secs(10));
        throttle.signal(Duration::from_secs(3));

        let before = tokio::time::Instant::now();
        throttle.wait().await;
        assert_eq!(before.elapsed(), Duration::from_secs(10));
    }
}
