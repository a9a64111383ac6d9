//! Usage categories, quotas and billing periods.

use core::fmt;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::tier::Feature;

/// Error returned when a usage category name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown usage category: {0}")]
pub struct UsageCategoryError(pub String);

/// A quota bucket for a class of AI-generated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    /// Product title and description rewrites (bulk optimizer).
    Descriptions,
    /// Product image alt text.
    AltText,
    /// Ad copy per product.
    Ads,
    /// Product music video scripts.
    MusicVideos,
}

/// How consumption in a category is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingModel {
    /// One unit per batch run that completed at least one entity.
    PerBatch,
    /// One unit per entity whose changes were fully applied.
    PerUnit,
}

impl UsageCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Descriptions, Self::AltText, Self::Ads, Self::MusicVideos];

    /// Stable storage name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Descriptions => "descriptions",
            Self::AltText => "alt_text",
            Self::Ads => "ads",
            Self::MusicVideos => "music_videos",
        }
    }

    /// Feature flag a tier must enable before the category is usable at all.
    #[must_use]
    pub const fn required_feature(self) -> Feature {
        match self {
            Self::Descriptions => Feature::BulkOptimizer,
            Self::AltText => Feature::AltText,
            Self::Ads => Feature::AdGeneration,
            Self::MusicVideos => Feature::MusicVideos,
        }
    }

    /// How consumption in this category is billed.
    #[must_use]
    pub const fn billing_model(self) -> BillingModel {
        match self {
            Self::Descriptions | Self::AltText => BillingModel::PerBatch,
            Self::Ads | Self::MusicVideos => BillingModel::PerUnit,
        }
    }
}

impl fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UsageCategory {
    type Err = UsageCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UsageCategoryError(s.to_string()))
    }
}

/// A monthly allowance, or no limit at all.
///
/// Serializes as a number, or `null` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Quota {
    /// At most this many units per period.
    Limited(u32),
    /// No cap.
    Unlimited,
}

impl Quota {
    /// Whether one more unit fits given `used` units already consumed.
    #[must_use]
    pub fn allows(self, used: u64) -> bool {
        match self {
            Self::Limited(limit) => used < u64::from(limit),
            Self::Unlimited => true,
        }
    }

    /// Units still available, or `None` when unlimited.
    #[must_use]
    pub fn remaining(self, used: u64) -> Option<u64> {
        match self {
            Self::Limited(limit) => Some(u64::from(limit).saturating_sub(used)),
            Self::Unlimited => None,
        }
    }

    /// The limit, or `None` when unlimited.
    #[must_use]
    pub const fn limit(self) -> Option<u32> {
        match self {
            Self::Limited(limit) => Some(limit),
            Self::Unlimited => None,
        }
    }
}

impl From<Option<u32>> for Quota {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Self::Unlimited, Self::Limited)
    }
}

impl From<Quota> for Option<u32> {
    fn from(quota: Quota) -> Self {
        quota.limit()
    }
}

/// A calendar-month usage period in UTC.
///
/// Periods are derived from a timestamp, never stored as mutable state: a new
/// month simply produces a new key whose counters start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsagePeriod {
    start: NaiveDate,
}

impl UsagePeriod {
    /// The period containing `at`.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self::starting_on_month_of(at.date_naive())
    }

    fn starting_on_month_of(date: NaiveDate) -> Self {
        Self {
            start: date - TimeDelta::days(i64::from(date.day0())),
        }
    }

    /// First day of the period.
    #[must_use]
    pub const fn start(self) -> NaiveDate {
        self.start
    }

    /// The following month.
    #[must_use]
    pub fn next(self) -> Self {
        // Day 1 plus 31 days always lands in the following month.
        Self::starting_on_month_of(self.start + TimeDelta::days(31))
    }

    /// Calendar year of the period.
    #[must_use]
    pub fn year(self) -> i32 {
        self.start.year()
    }

    /// Calendar month of the period (1-12).
    #[must_use]
    pub fn month(self) -> u32 {
        self.start.month()
    }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}
