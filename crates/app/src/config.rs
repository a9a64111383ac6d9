//! App configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHELFWISE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPIFY_API_KEY` - Shopify app client ID (session token audience)
//! - `SHOPIFY_API_SECRET` - Shopify app client secret (signs session tokens and webhooks)
//! - `GEMINI_API_KEY` - Generative Language API key
//!
//! ## Optional
//! - `SHELFWISE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHELFWISE_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-10)
//! - `GEMINI_MODEL` - Model ID (default: gemini-2.5-flash)
//! - `GEMINI_BASE_URL` - API base URL (default: Google's public endpoint)
//! - `BATCH_CONCURRENCY` - Entities processed at once per batch run (default: 5, max 20)
//! - `BATCH_MAX_BACKOFF_SECS` - Longest pause after a rate-limit signal (default: 30)
//! - `PLAN_CACHE_TTL_SECS` - How long a shop's resolved tier is cached (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_API_VERSION: &str = "2025-10";
const DEFAULT_BATCH_CONCURRENCY: usize = 5;
const MAX_BATCH_CONCURRENCY: usize = 20;
const DEFAULT_MAX_BACKOFF_SECS: u64 = 30;
const DEFAULT_PLAN_CACHE_TTL_SECS: u64 = 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shopify app credentials
    pub shopify: ShopifyAppConfig,
    /// Generative Language API configuration
    pub gemini: GeminiConfig,
    /// Batch orchestration limits
    pub batch: BatchConfig,
    /// How long a resolved tier stays cached per shop
    pub plan_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App client ID; the `aud` claim of every session token
    pub api_key: String,
    /// App client secret; signs session tokens and webhook payloads
    pub api_secret: SecretString,
    /// Admin API version (e.g., 2025-10)
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Generative Language API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: SecretString,
    /// Model ID (e.g., gemini-2.5-flash)
    pub model: String,
    /// Base URL, without a trailing slash
    pub base_url: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Batch orchestration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Entities processed concurrently within one run
    pub concurrency: usize,
    /// Upper bound on the pause after a rate-limit signal
    pub max_backoff: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BATCH_CONCURRENCY,
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHELFWISE_DATABASE_URL")?;
        let host = get_env_or_default("SHELFWISE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHELFWISE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SHELFWISE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHELFWISE_PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyAppConfig::from_env()?;
        let gemini = GeminiConfig::from_env()?;
        let batch = BatchConfig::from_env()?;
        let plan_cache_ttl = Duration::from_secs(parse_u64_or_default(
            "PLAN_CACHE_TTL_SECS",
            DEFAULT_PLAN_CACHE_TTL_SECS,
        )?);

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.2);

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            gemini,
            batch,
            plan_cache_ttl,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
        })
    }
}

impl GeminiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_validated_secret("GEMINI_API_KEY")?,
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            base_url: get_env_or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl BatchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let concurrency = match get_optional_env("BATCH_CONCURRENCY") {
            Some(raw) => parse_concurrency(&raw)?,
            None => DEFAULT_BATCH_CONCURRENCY,
        };
        let max_backoff = Duration::from_secs(parse_u64_or_default(
            "BATCH_MAX_BACKOFF_SECS",
            DEFAULT_MAX_BACKOFF_SECS,
        )?);

        Ok(Self {
            concurrency,
            max_backoff,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse `BATCH_CONCURRENCY`, which must lie in `1..=MAX_BATCH_CONCURRENCY`.
fn parse_concurrency(raw: &str) -> Result<usize, ConfigError> {
    let value = raw.trim().parse::<usize>().map_err(|e| {
        ConfigError::InvalidEnvVar("BATCH_CONCURRENCY".to_string(), e.to_string())
    })?;
    if value == 0 || value > MAX_BATCH_CONCURRENCY {
        return Err(ConfigError::InvalidEnvVar(
            "BATCH_CONCURRENCY".to_string(),
            format!("must be between 1 and {MAX_BATCH_CONCURRENCY} (got {value})"),
        ));
    }
    Ok(value)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the credential issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
