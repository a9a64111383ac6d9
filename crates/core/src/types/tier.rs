//! Subscription tier definitions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::usage::{Quota, UsageCategory};

/// A feature flag a tier may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Bulk product title/description optimization.
    BulkOptimizer,
    /// Image alt text generation.
    AltText,
    /// Per-product ad copy generation.
    AdGeneration,
    /// Product music video scripts.
    MusicVideos,
}

/// An immutable subscription plan: price, scan size, features and quotas.
///
/// Definitions are `'static` data owned by [`crate::catalog`]; handlers only
/// ever hold references to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierDefinition {
    /// Tier name, e.g. `starter`.
    pub name: &'static str,
    /// Monthly price in USD.
    pub monthly_price: Decimal,
    /// Maximum entities selected into one batch run.
    pub max_products_per_scan: Quota,
    /// Enabled feature flags.
    pub features: &'static [Feature],
    /// Monthly quota per category. Categories absent here have a zero quota.
    pub quotas: &'static [(UsageCategory, Quota)],
    /// Whether this tier is the trial path guarded by the anti-churn lockout.
    pub trial_path: bool,
}

impl TierDefinition {
    /// Whether the tier enables `feature`.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Monthly quota for `category`; zero when the tier does not list it.
    #[must_use]
    pub fn quota_for(&self, category: UsageCategory) -> Quota {
        self.quotas
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(Quota::Limited(0), |(_, quota)| *quota)
    }

    /// Whether the tier is entitled to `category` at all.
    #[must_use]
    pub fn is_entitled(&self, category: UsageCategory) -> bool {
        self.has_feature(category.required_feature())
    }
}
