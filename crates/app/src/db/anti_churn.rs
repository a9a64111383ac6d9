//! Anti-churn record repository.

use chrono::{DateTime, Utc};
use shelfwise_core::ShopDomain;
use sqlx::PgPool;

use crate::billing::{AntiChurnRecord, AntiChurnRepository};

use super::RepositoryError;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct AntiChurnRow {
    shop: String,
    last_uninstalled: Option<DateTime<Utc>>,
    trial_used: bool,
}

impl TryFrom<AntiChurnRow> for AntiChurnRecord {
    type Error = RepositoryError;

    fn try_from(row: AntiChurnRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop)
            .map_err(|e| RepositoryError::DataCorruption(format!("{}: {e}", row.shop)))?;
        Ok(Self {
            shop,
            last_uninstalled: row.last_uninstalled,
            trial_used: row.trial_used,
        })
    }
}

/// `PostgreSQL` implementation of [`AntiChurnRepository`].
pub struct PgAntiChurnRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PgAntiChurnRepository<'a> {
    /// Create a new anti-churn repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Clear `last_uninstalled` for a shop, keeping `trial_used`.
    ///
    /// Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_lockout(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE anti_churn
            SET last_uninstalled = NULL, updated_at = NOW()
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl AntiChurnRepository for PgAntiChurnRepository<'_> {
    async fn find(&self, shop: &ShopDomain) -> Result<Option<AntiChurnRecord>, RepositoryError> {
        let row: Option<AntiChurnRow> = sqlx::query_as(
            r"
            SELECT shop, last_uninstalled, trial_used
            FROM anti_churn
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AntiChurnRecord::try_from).transpose()
    }

    async fn record_uninstall(
        &self,
        shop: &ShopDomain,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO anti_churn (shop, last_uninstalled, trial_used)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (shop) DO UPDATE SET
                last_uninstalled = EXCLUDED.last_uninstalled,
                trial_used = TRUE,
                updated_at = NOW()
            ",
        )
        .bind(shop.as_str())
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
