//! Usage counter repository.
//!
//! Every increment is a single `INSERT ... ON CONFLICT DO UPDATE` that adds to
//! the stored count and returns the result, so concurrent writers never lose
//! an update. Each increment also writes one `usage_events` row in the same
//! transaction.

use shelfwise_core::{ShopDomain, UsageCategory, UsagePeriod};
use sqlx::PgPool;

use crate::billing::UsageRepository;

use super::{RepositoryError, count_from_db};

/// `PostgreSQL` implementation of [`UsageRepository`].
pub struct PgUsageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PgUsageRepository<'a> {
    /// Create a new usage repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All counters of a shop for one period.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` for an unknown category or negative count.
    pub async fn counts_for_period(
        &self,
        shop: &ShopDomain,
        period: UsagePeriod,
    ) -> Result<Vec<(UsageCategory, u64)>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT category, count
            FROM usage_records
            WHERE shop = $1 AND period_start = $2
            ORDER BY category
            ",
        )
        .bind(shop.as_str())
        .bind(period.start())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(category, count)| {
                let category = category
                    .parse::<UsageCategory>()
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
                Ok((category, count_from_db(count)?))
            })
            .collect()
    }
}

impl UsageRepository for PgUsageRepository<'_> {
    async fn current_count(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
    ) -> Result<u64, RepositoryError> {
        let count: Option<i64> = sqlx::query_scalar(
            r"
            SELECT count
            FROM usage_records
            WHERE shop = $1 AND category = $2 AND period_start = $3
            ",
        )
        .bind(shop.as_str())
        .bind(category.as_str())
        .bind(period.start())
        .fetch_optional(self.pool)
        .await?;

        count.map_or(Ok(0), count_from_db)
    }

    async fn add(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
        units: u32,
        metadata: &serde_json::Value,
    ) -> Result<u64, RepositoryError> {
        let units = i32::try_from(units)
            .map_err(|_| RepositoryError::Conflict(format!("usage increment too large: {units}")))?;

        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar(
            r"
            INSERT INTO usage_records (shop, category, period_start, count)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop, category, period_start) DO UPDATE SET
                count = usage_records.count + EXCLUDED.count,
                updated_at = NOW()
            RETURNING count
            ",
        )
        .bind(shop.as_str())
        .bind(category.as_str())
        .bind(period.start())
        .bind(i64::from(units))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO usage_events (shop, category, period_start, units, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(shop.as_str())
        .bind(category.as_str())
        .bind(period.start())
        .bind(units)
        .bind(sqlx::types::Json(metadata))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        count_from_db(count)
    }
}
