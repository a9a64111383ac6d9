//! Static subscription tier catalog.
//!
//! | tier | price | per scan | descriptions | alt text | ads | music videos |
//! |---|---|---|---|---|---|---|
//! | free | 0.00 | 15 | 3 | 3 | - | - |
//! | starter | 19.00 | 50 | 20 | 20 | 30 | - |
//! | professional | 49.00 | 250 | 100 | 100 | 150 | 10 |
//! | enterprise | 149.00 | unlimited | unlimited | unlimited | unlimited | unlimited |
//!
//! Unknown tier names resolve to [`RESTRICTED`], which enables nothing.

use rust_decimal::Decimal;

use crate::types::{Feature, Quota, TierDefinition, UsageCategory};

/// Tier every shop starts on.
pub const DEFAULT_TIER: &str = "free";

const fn usd(cents: u32) -> Decimal {
    Decimal::from_parts(cents, 0, 0, false, 2)
}

/// Fallback for unrecognised tier names: no features, zero quotas.
pub static RESTRICTED: TierDefinition = TierDefinition {
    name: "restricted",
    monthly_price: usd(0),
    max_products_per_scan: Quota::Limited(0),
    features: &[],
    quotas: &[],
    trial_path: false,
};

/// All sellable tiers, cheapest first.
pub static TIERS: [TierDefinition; 4] = [
    TierDefinition {
        name: "free",
        monthly_price: usd(0),
        max_products_per_scan: Quota::Limited(15),
        features: &[Feature::BulkOptimizer, Feature::AltText],
        quotas: &[
            (UsageCategory::Descriptions, Quota::Limited(3)),
            (UsageCategory::AltText, Quota::Limited(3)),
        ],
        trial_path: true,
    },
    TierDefinition {
        name: "starter",
        monthly_price: usd(1900),
        max_products_per_scan: Quota::Limited(50),
        features: &[Feature::BulkOptimizer, Feature::AltText, Feature::AdGeneration],
        quotas: &[
            (UsageCategory::Descriptions, Quota::Limited(20)),
            (UsageCategory::AltText, Quota::Limited(20)),
            (UsageCategory::Ads, Quota::Limited(30)),
        ],
        trial_path: false,
    },
    TierDefinition {
        name: "professional",
        monthly_price: usd(4900),
        max_products_per_scan: Quota::Limited(250),
        features: &[
            Feature::BulkOptimizer,
            Feature::AltText,
            Feature::AdGeneration,
            Feature::MusicVideos,
        ],
        quotas: &[
            (UsageCategory::Descriptions, Quota::Limited(100)),
            (UsageCategory::AltText, Quota::Limited(100)),
            (UsageCategory::Ads, Quota::Limited(150)),
            (UsageCategory::MusicVideos, Quota::Limited(10)),
        ],
        trial_path: false,
    },
    TierDefinition {
        name: "enterprise",
        monthly_price: usd(14900),
        max_products_per_scan: Quota::Unlimited,
        features: &[
            Feature::BulkOptimizer,
            Feature::AltText,
            Feature::AdGeneration,
            Feature::MusicVideos,
        ],
        quotas: &[
            (UsageCategory::Descriptions, Quota::Unlimited),
            (UsageCategory::AltText, Quota::Unlimited),
            (UsageCategory::Ads, Quota::Unlimited),
            (UsageCategory::MusicVideos, Quota::Unlimited),
        ],
        trial_path: false,
    },
];

/// Look up a tier by name (case-insensitive).
#[must_use]
pub fn lookup(name: &str) -> Option<&'static TierDefinition> {
    let name = name.trim();
    TIERS.iter().find(|tier| tier.name.eq_ignore_ascii_case(name))
}

/// Look up a tier, falling back to [`RESTRICTED`] for unknown names.
#[must_use]
pub fn resolve(name: &str) -> &'static TierDefinition {
    lookup(name).unwrap_or(&RESTRICTED)
}

/// Whether `tier` enables `feature`.
#[must_use]
pub fn has_feature(tier: &TierDefinition, feature: Feature) -> bool {
    tier.has_feature(feature)
}

/// Monthly quota of `tier` for `category`.
#[must_use]
pub fn quota_for(tier: &TierDefinition, category: UsageCategory) -> Quota {
    tier.quota_for(category)
}
