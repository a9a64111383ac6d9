//! Tier-gated usage accounting and anti-churn lockout.
//!
//! # Components
//!
//! - [`usage`] - Monthly counters per shop and category, quota decisions
//! - [`anti_churn`] - 180-day lockout after uninstall, trial eligibility
//! - [`gate`] - Shop-level check run before any AI work
//! - [`plan`] - Tier resolution from the active app subscription
//! - [`clock`] - Injected time source

pub mod anti_churn;
pub mod clock;
pub mod gate;
pub mod plan;
pub mod usage;

pub use anti_churn::{AntiChurnGuard, AntiChurnRecord, AntiChurnRepository, ChurnStatus};
pub use clock::{Clock, SystemClock};
pub use gate::{GateError, authorize};
pub use plan::{FixedPlanResolver, PlanResolver, SubscriptionPlanResolver};
pub use usage::{
    CategoryUsage, Decision, DenyReason, LedgerError, UsageLedger, UsageRepository,
};
