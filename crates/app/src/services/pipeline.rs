//! Gated copywriting runs: gate, select, orchestrate, bill.
//!
//! Quota is checked once before any entity work. Per-batch categories are
//! charged one unit after a run that optimized at least one product. Per-unit
//! categories are capped at the remaining allowance and charged per product
//! as each one is tagged.

use serde::Serialize;
use shelfwise_core::{BillingModel, Quota, ShopDomain, TierDefinition, UsageCategory};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::batch::{BatchEntry, BatchReport, BatchRunner, BatchTransform, LedgerHook, NoHook};
use crate::billing::{
    AntiChurnGuard, AntiChurnRepository, Clock, GateError, UsageLedger, UsageRepository, authorize,
};
use crate::gemini::ContentGenerator;
use crate::models::ShopSettings;
use crate::shopify::{AdminShopifyError, CommerceAdmin, ProductSnapshot};

use super::{ads, alt_text, descriptions};

/// Scan size used when the tier does not cap it.
pub const UNLIMITED_SCAN_CAP: usize = 250;

/// A copywriting pipeline exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    Descriptions,
    AltText,
    Ads,
}

impl Pipeline {
    /// Usage category the pipeline consumes.
    #[must_use]
    pub const fn category(self) -> UsageCategory {
        match self {
            Self::Descriptions => UsageCategory::Descriptions,
            Self::AltText => UsageCategory::AltText,
            Self::Ads => UsageCategory::Ads,
        }
    }

    /// Idempotency tag applied to finished products.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Descriptions => descriptions::TAG,
            Self::AltText => alt_text::TAG,
            Self::Ads => ads::TAG,
        }
    }
}

/// Errors that stop a run before entity work begins.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Lockout, quota or infrastructure failure from the gate.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Product selection failed.
    #[error("product selection failed: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// The requested product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(String),
}

/// Result of a gated run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub pipeline: Pipeline,
    #[serde(flatten)]
    pub report: BatchReport,
    /// False when the run optimized products but the charge could not be stored.
    pub usage_recorded: bool,
}

/// Everything a run needs for one shop.
pub struct PipelineContext<'a, G, A, U, R, C> {
    pub runner: &'a BatchRunner,
    pub generator: &'a G,
    pub admin: &'a A,
    pub ledger: &'a UsageLedger<U, C>,
    pub guard: &'a AntiChurnGuard<R, C>,
    pub shop: &'a ShopDomain,
    pub tier: &'static TierDefinition,
    pub settings: &'a ShopSettings,
}

impl<G, A, U, R, C> PipelineContext<'_, G, A, U, R, C>
where
    G: ContentGenerator,
    A: CommerceAdmin,
    U: UsageRepository,
    R: AntiChurnRepository,
    C: Clock,
{
    /// Optimize up to `requested` untagged products with `pipeline`.
    ///
    /// The selection size is capped by the tier's scan size.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Gate` when the shop may not run the pipeline,
    /// and `PipelineError::Shopify` when products cannot be selected.
    #[instrument(skip(self), fields(shop = %self.shop, tier = self.tier.name))]
    pub async fn run_batch(
        &self,
        pipeline: Pipeline,
        requested: Option<u32>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let category = pipeline.category();
        let remaining = authorize(self.ledger, self.guard, self.shop, self.tier, category).await?;

        let limit = scan_limit(self.tier, requested);
        let products = self.admin.products_without_tag(pipeline.tag(), limit).await?;
        tracing::info!(selected = products.len(), limit, "Selected products for batch");

        Ok(self.execute(pipeline, products, remaining).await)
    }

    /// Rewrite one product's title and description.
    ///
    /// The product is processed even if it already carries the tag.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Gate` when the shop may not run the pipeline,
    /// and `PipelineError::ProductNotFound` when the product does not exist.
    #[instrument(skip(self), fields(shop = %self.shop, tier = self.tier.name))]
    pub async fn optimize_product(&self, product_id: &str) -> Result<PipelineOutcome, PipelineError> {
        let pipeline = Pipeline::Descriptions;
        let remaining =
            authorize(self.ledger, self.guard, self.shop, self.tier, pipeline.category()).await?;

        let product = self
            .admin
            .product(product_id)
            .await?
            .ok_or_else(|| PipelineError::ProductNotFound(product_id.to_string()))?;

        Ok(self.execute(pipeline, vec![product], remaining).await)
    }

    async fn execute(
        &self,
        pipeline: Pipeline,
        products: Vec<ProductSnapshot>,
        remaining: Option<u64>,
    ) -> PipelineOutcome {
        let (report, usage_recorded) = match pipeline {
            Pipeline::Descriptions => {
                let transform =
                    descriptions::DescriptionTransform::new(self.generator, self.admin, self.settings);
                self.orchestrate(pipeline, &transform, products, remaining).await
            }
            Pipeline::AltText => {
                let transform =
                    alt_text::AltTextTransform::new(self.generator, self.admin, self.settings);
                self.orchestrate(pipeline, &transform, products, remaining).await
            }
            Pipeline::Ads => {
                let transform = ads::AdCopyTransform::new(self.generator, self.admin, self.settings);
                self.orchestrate(pipeline, &transform, products, remaining).await
            }
        };

        PipelineOutcome {
            pipeline,
            report,
            usage_recorded,
        }
    }

    async fn orchestrate<T>(
        &self,
        pipeline: Pipeline,
        transform: &T,
        products: Vec<ProductSnapshot>,
        remaining: Option<u64>,
    ) -> (BatchReport, bool)
    where
        T: BatchTransform<Entity = ProductSnapshot>,
    {
        let category = pipeline.category();
        let run_id = Uuid::new_v4();

        match category.billing_model() {
            BillingModel::PerUnit => {
                let (products, over_quota) = split_at_allowance(products, remaining);
                let hook = LedgerHook::new(self.ledger, self.shop, category, run_id);
                let mut report = self
                    .runner
                    .run_with_id(run_id, products, transform, pipeline.tag(), &hook)
                    .await;
                report.push_skipped(
                    over_quota
                        .into_iter()
                        .map(|p| BatchEntry::skipped(p.id, "monthly quota reached")),
                );
                let usage_recorded = hook.all_recorded();
                (report, usage_recorded)
            }
            BillingModel::PerBatch => {
                let report = self
                    .runner
                    .run_with_id(run_id, products, transform, pipeline.tag(), &NoHook)
                    .await;
                let usage_recorded = self.charge_batch(category, &report).await;
                (report, usage_recorded)
            }
        }
    }

    async fn charge_batch(&self, category: UsageCategory, report: &BatchReport) -> bool {
        if report.counts.optimized == 0 {
            return true;
        }
        let metadata = serde_json::json!({
            "batch_id": report.run_id,
            "optimized": report.counts.optimized,
            "failed": report.counts.failed,
        });
        match self.ledger.record_usage(self.shop, category, &metadata).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(run_id = %report.run_id, error = %e, "Failed to record batch usage");
                false
            }
        }
    }
}

/// Products to select for one run.
#[must_use]
pub fn scan_limit(tier: &TierDefinition, requested: Option<u32>) -> usize {
    let cap = match tier.max_products_per_scan {
        Quota::Limited(n) => usize::try_from(n).unwrap_or(usize::MAX),
        Quota::Unlimited => UNLIMITED_SCAN_CAP,
    };
    requested
        .and_then(|n| usize::try_from(n).ok())
        .map_or(cap, |n| n.min(cap))
}

/// Split the selection at the remaining per-unit allowance (`None` is unlimited).
#[must_use]
pub fn split_at_allowance<T>(mut items: Vec<T>, remaining: Option<u64>) -> (Vec<T>, Vec<T>) {
    let Some(remaining) = remaining else {
        return (items, Vec::new());
    };
    let allowed = usize::try_from(remaining).unwrap_or(usize::MAX).min(items.len());
    let excess = items.split_off(allowed);
    (items, excess)
}
