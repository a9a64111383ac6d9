//! Core types for Shelfwise.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod shop;
pub mod status;
pub mod tier;
pub mod usage;

pub use shop::{ShopDomain, ShopDomainError};
pub use status::*;
pub use tier::{Feature, TierDefinition};
pub use usage::{BillingModel, Quota, UsageCategory, UsageCategoryError, UsagePeriod};
