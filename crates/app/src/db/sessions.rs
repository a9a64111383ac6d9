//! Shop session repository for offline Admin API access tokens.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use shelfwise_core::ShopDomain;
use sqlx::PgPool;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A stored offline access token for one shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSessionRecord {
    /// Shop domain (e.g., acme-goods.myshopify.com).
    pub shop: ShopDomain,
    /// Offline access token (redacted in debug output).
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// When the token was obtained.
    pub obtained_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSessionRecord")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Internal row type for `PostgreSQL` queries.
#[derive(sqlx::FromRow)]
struct ShopSessionRow {
    shop: String,
    access_token: String,
    scope: String,
    obtained_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSessionRecord {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop)
            .map_err(|e| RepositoryError::DataCorruption(format!("{}: {e}", row.shop)))?;

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            scopes: split_scopes(&row.scope),
            obtained_at: row.obtained_at,
        })
    }
}

fn split_scopes(scope: &str) -> Vec<String> {
    scope
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for shop session database operations.
pub struct ShopSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopSessionRepository<'a> {
    /// Create a new shop session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<ShopSessionRecord>, RepositoryError> {
        let row: Option<ShopSessionRow> = sqlx::query_as(
            r"
            SELECT shop, access_token, scope, obtained_at
            FROM shop_sessions
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(ShopSessionRecord::try_from).transpose()
    }

    /// Save or update the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &str,
        scopes: &[String],
    ) -> Result<(), RepositoryError> {
        let scope = scopes.join(",");

        sqlx::query(
            r"
            INSERT INTO shop_sessions (shop, access_token, scope, obtained_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                obtained_at = EXCLUDED.obtained_at,
                updated_at = NOW()
            ",
        )
        .bind(shop.as_str())
        .bind(access_token)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop_sessions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
