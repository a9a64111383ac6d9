//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::batch::BatchRunner;
use crate::billing::{
    AntiChurnGuard, SubscriptionPlanResolver, SystemClock, UsageLedger,
};
use crate::config::AppConfig;
use crate::db::{PgAntiChurnRepository, PgUsageRepository};
use crate::gemini::GeminiClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    http: reqwest::Client,
    gemini: GeminiClient,
    plans: SubscriptionPlanResolver,
    batch: BatchRunner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let http = reqwest::Client::new();
        let gemini = GeminiClient::new(http.clone(), &config.gemini);
        let plans = SubscriptionPlanResolver::new(config.plan_cache_ttl);
        let batch = BatchRunner::new(config.batch);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                http,
                gemini,
                plans,
                batch,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Shared HTTP client for Shopify and token exchange.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Get a reference to the Gemini client.
    #[must_use]
    pub fn gemini(&self) -> &GeminiClient {
        &self.inner.gemini
    }

    /// Cached tier resolver.
    #[must_use]
    pub fn plans(&self) -> &SubscriptionPlanResolver {
        &self.inner.plans
    }

    /// Batch runner configured from `BATCH_*` settings.
    #[must_use]
    pub fn batch(&self) -> &BatchRunner {
        &self.inner.batch
    }

    /// Usage ledger over the shared pool.
    #[must_use]
    pub fn ledger(&self) -> UsageLedger<PgUsageRepository<'_>, SystemClock> {
        UsageLedger::new(PgUsageRepository::new(self.pool()), SystemClock)
    }

    /// Anti-churn guard over the shared pool.
    #[must_use]
    pub fn anti_churn(&self) -> AntiChurnGuard<PgAntiChurnRepository<'_>, SystemClock> {
        AntiChurnGuard::new(PgAntiChurnRepository::new(self.pool()), SystemClock)
    }
}
