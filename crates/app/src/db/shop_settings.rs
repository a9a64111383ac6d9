//! Per-shop settings repository.

use shelfwise_core::ShopDomain;
use sqlx::PgPool;

use crate::models::ShopSettings;

use super::RepositoryError;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSettingsRow {
    brand_voice: String,
    target_language: String,
    max_description_words: i32,
}

impl TryFrom<ShopSettingsRow> for ShopSettings {
    type Error = RepositoryError;

    fn try_from(row: ShopSettingsRow) -> Result<Self, Self::Error> {
        let max_description_words = u32::try_from(row.max_description_words).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative max_description_words {}",
                row.max_description_words
            ))
        })?;

        Ok(Self {
            brand_voice: row.brand_voice,
            target_language: row.target_language,
            max_description_words,
        })
    }
}

/// Repository for per-shop settings.
pub struct ShopSettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopSettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Settings for a shop, or the defaults when none are stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &ShopDomain) -> Result<ShopSettings, RepositoryError> {
        let row: Option<ShopSettingsRow> = sqlx::query_as(
            r"
            SELECT brand_voice, target_language, max_description_words
            FROM shop_settings
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map_or_else(|| Ok(ShopSettings::default()), ShopSettings::try_from)
    }

    /// Insert or replace the settings for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a value violates a table
    /// constraint, or `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        shop: &ShopDomain,
        settings: &ShopSettings,
    ) -> Result<(), RepositoryError> {
        let words = i32::try_from(settings.max_description_words).map_err(|_| {
            RepositoryError::Conflict("max_description_words out of range".to_string())
        })?;

        sqlx::query(
            r"
            INSERT INTO shop_settings (shop, brand_voice, target_language, max_description_words)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE SET
                brand_voice = EXCLUDED.brand_voice,
                target_language = EXCLUDED.target_language,
                max_description_words = EXCLUDED.max_description_words,
                updated_at = NOW()
            ",
        )
        .bind(shop.as_str())
        .bind(&settings.brand_voice)
        .bind(&settings.target_language)
        .bind(words)
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                RepositoryError::Conflict(db_err.message().to_string())
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(())
    }
}
