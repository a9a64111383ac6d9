//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shelfwise-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHELFWISE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/app/migrations/` and are embedded at compile time.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../app/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
