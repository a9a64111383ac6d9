//! CLI subcommands.

pub mod migrate;
pub mod shops;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by the database-backed commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository query failed.
    #[error("Repository error: {0}")]
    Repository(#[from] shelfwise_app::db::RepositoryError),

    /// Invalid shop domain argument.
    #[error("Invalid shop: {0}")]
    InvalidShop(#[from] shelfwise_core::ShopDomainError),
}

/// Connect using `SHELFWISE_DATABASE_URL`, falling back to `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("SHELFWISE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("SHELFWISE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(shelfwise_app::db::create_pool(&SecretString::from(database_url)).await?)
}
