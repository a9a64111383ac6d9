//! Database operations for Shelfwise `PostgreSQL`.
//!
//! ## Tables
//!
//! - `shop_sessions` - Offline Admin API access tokens per shop
//! - `shop_settings` - Per-shop prompt settings (brand voice, language, length)
//! - `usage_records` - Monthly usage counters per shop and category
//! - `usage_events` - Audit row per counter increment (JSONB metadata)
//! - `anti_churn` - Last uninstall timestamp and trial flag per shop
//!
//! # Migrations
//!
//! Migrations are stored in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p shelfwise-cli -- migrate
//! ```

pub mod anti_churn;
pub mod sessions;
pub mod shop_settings;
pub mod usage;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use anti_churn::PgAntiChurnRepository;
pub use sessions::{ShopSessionRecord, ShopSessionRepository};
pub use shop_settings::ShopSettingsRepository;
pub use usage::PgUsageRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored `BIGINT` counter into the unsigned domain type.
fn count_from_db(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative usage count {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_from_db() {
        assert_eq!(count_from_db(0).ok(), Some(0));
        assert_eq!(count_from_db(42).ok(), Some(42));
        assert!(matches!(
            count_from_db(-1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
