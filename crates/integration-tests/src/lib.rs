//! Integration tests for Shelfwise.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shelfwise-integration-tests
//! ```
//!
//! None of the tests need a database or network access: repositories and
//! the commerce platform are in-memory fakes defined here, and the HTTP
//! clients run against `wiremock` servers.
//!
//! # Test Categories
//!
//! - `ledger` - Quota boundaries, period isolation, concurrent recording
//! - `anti_churn` - Lockout window, trial eligibility, gate order
//! - `batch` - Orchestrator partial failure, idempotency tag, billing
//! - `gemini_client` / `shopify_admin` - HTTP clients against mock servers
//! - `http` - Router rejection paths and token exchange

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use shelfwise_app::billing::{AntiChurnRecord, AntiChurnRepository, Clock, UsageRepository};
use shelfwise_app::db::RepositoryError;
use shelfwise_app::gemini::{ContentGenerator, GeminiError, GenerationRequest};
use shelfwise_app::shopify::{
    AdminShopifyError, AppSubscription, CommerceAdmin, MetafieldInput, ProductContentUpdate,
    ProductImage, ProductSnapshot, ShopDetails,
};
use shelfwise_core::{ShopDomain, UsageCategory, UsagePeriod};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shop domain used throughout the tests.
///
/// # Panics
///
/// Never; the literal is a valid shop domain.
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn test_shop() -> ShopDomain {
    ShopDomain::parse("test-store.myshopify.com").unwrap_or_else(|_| unreachable!())
}

/// A product snapshot with one image.
#[must_use]
pub fn product(n: u32) -> ProductSnapshot {
    ProductSnapshot {
        id: format!("gid://shopify/Product/{n}"),
        title: format!("Product {n}"),
        description_html: format!("<p>Description {n}</p>"),
        product_type: "Mug".to_string(),
        vendor: "Acme".to_string(),
        tags: vec![],
        images: vec![ProductImage {
            id: format!("gid://shopify/MediaImage/{n}"),
            url: format!("https://cdn.example.com/{n}.png"),
            alt: None,
        }],
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Settable clock.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// Clock frozen at `at`.
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    /// Move the clock to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        *lock(&self.0) = at;
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = lock(&self.0);
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

// =============================================================================
// Usage repository
// =============================================================================

type UsageKey = (String, UsageCategory, UsagePeriod);

/// In-memory usage counters with an optional artificial delay per call.
///
/// The add is atomic under one lock, like the SQL upsert it stands in for.
#[derive(Debug, Default)]
pub struct InMemoryUsageRepository {
    counts: Mutex<HashMap<UsageKey, u64>>,
    events: Mutex<Vec<serde_json::Value>>,
    delay: Duration,
    fail: AtomicBool,
}

impl InMemoryUsageRepository {
    /// Repository answering immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository sleeping `delay` before every read and write.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Make every call fail with a database error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Seed a counter.
    pub fn seed(&self, shop: &ShopDomain, category: UsageCategory, period: UsagePeriod, count: u64) {
        lock(&self.counts).insert((shop.as_str().to_string(), category, period), count);
    }

    /// Counter value without going through the trait.
    #[must_use]
    pub fn count(&self, shop: &ShopDomain, category: UsageCategory, period: UsagePeriod) -> u64 {
        lock(&self.counts)
            .get(&(shop.as_str().to_string(), category, period))
            .copied()
            .unwrap_or(0)
    }

    /// Metadata of every recorded increment, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<serde_json::Value> {
        lock(&self.events).clone()
    }

    async fn pause(&self) -> Result<(), RepositoryError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl UsageRepository for InMemoryUsageRepository {
    async fn current_count(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
    ) -> Result<u64, RepositoryError> {
        self.pause().await?;
        Ok(self.count(shop, category, period))
    }

    async fn add(
        &self,
        shop: &ShopDomain,
        category: UsageCategory,
        period: UsagePeriod,
        units: u32,
        metadata: &serde_json::Value,
    ) -> Result<u64, RepositoryError> {
        self.pause().await?;
        let new_count = {
            let mut counts = lock(&self.counts);
            let count = counts
                .entry((shop.as_str().to_string(), category, period))
                .or_insert(0);
            *count += u64::from(units);
            *count
        };
        lock(&self.events).push(metadata.clone());
        Ok(new_count)
    }
}

// =============================================================================
// Anti-churn repository
// =============================================================================

/// In-memory anti-churn records.
#[derive(Debug, Default)]
pub struct InMemoryAntiChurnRepository {
    records: Mutex<HashMap<String, AntiChurnRecord>>,
    fail: AtomicBool,
}

impl InMemoryAntiChurnRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record directly.
    pub fn insert(&self, record: AntiChurnRecord) {
        lock(&self.records).insert(record.shop.as_str().to_string(), record);
    }

    /// Make every call fail with a database error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl AntiChurnRepository for InMemoryAntiChurnRepository {
    async fn find(&self, shop: &ShopDomain) -> Result<Option<AntiChurnRecord>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.records).get(shop.as_str()).cloned())
    }

    async fn record_uninstall(
        &self,
        shop: &ShopDomain,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        lock(&self.records).insert(
            shop.as_str().to_string(),
            AntiChurnRecord {
                shop: shop.clone(),
                last_uninstalled: Some(at),
                trial_used: true,
            },
        );
        Ok(())
    }
}

// =============================================================================
// Commerce platform
// =============================================================================

/// In-memory catalog that applies writes and tracks tags.
#[derive(Debug, Default)]
pub struct FakeCommerce {
    products: Mutex<Vec<ProductSnapshot>>,
    metafields: Mutex<Vec<MetafieldInput>>,
    subscriptions: Mutex<Vec<AppSubscription>>,
    fail_update: Mutex<HashSet<String>>,
    fail_tag: Mutex<HashSet<String>>,
    update_calls: AtomicUsize,
    tag_calls: AtomicUsize,
}

impl FakeCommerce {
    /// Catalog holding `products`.
    #[must_use]
    pub fn with_products(products: Vec<ProductSnapshot>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// Reject content writes for `id`.
    pub fn fail_update_for(&self, id: &str) {
        lock(&self.fail_update).insert(id.to_string());
    }

    /// Reject tag writes for `id`.
    pub fn fail_tag_for(&self, id: &str) {
        lock(&self.fail_tag).insert(id.to_string());
    }

    /// Set the active subscriptions returned to the plan resolver.
    pub fn set_subscriptions(&self, subscriptions: Vec<AppSubscription>) {
        *lock(&self.subscriptions) = subscriptions;
    }

    /// Current state of a product.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProductSnapshot> {
        lock(&self.products).iter().find(|p| p.id == id).cloned()
    }

    /// Metafields written so far.
    #[must_use]
    pub fn metafields(&self) -> Vec<MetafieldInput> {
        lock(&self.metafields).clone()
    }

    /// Number of `update_product` calls, failed ones included.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `add_tags` calls, failed ones included.
    #[must_use]
    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }
}

impl CommerceAdmin for FakeCommerce {
    async fn products_without_tag(
        &self,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<ProductSnapshot>, AdminShopifyError> {
        Ok(lock(&self.products)
            .iter()
            .filter(|p| !p.has_tag(tag))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn product(&self, id: &str) -> Result<Option<ProductSnapshot>, AdminShopifyError> {
        Ok(self.get(id))
    }

    async fn update_product(&self, update: &ProductContentUpdate) -> Result<(), AdminShopifyError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.fail_update).contains(&update.id) {
            return Err(AdminShopifyError::UserError(format!(
                "product {} is locked",
                update.id
            )));
        }
        let mut products = lock(&self.products);
        let product = products
            .iter_mut()
            .find(|p| p.id == update.id)
            .ok_or_else(|| AdminShopifyError::NotFound(update.id.clone()))?;
        if let Some(title) = &update.title {
            product.title.clone_from(title);
        }
        if let Some(description) = &update.description_html {
            product.description_html.clone_from(description);
        }
        Ok(())
    }

    async fn add_tags(&self, id: &str, tags: &[String]) -> Result<(), AdminShopifyError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.fail_tag).contains(id) {
            return Err(AdminShopifyError::UserError(format!("cannot tag {id}")));
        }
        let mut products = lock(&self.products);
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AdminShopifyError::NotFound(id.to_string()))?;
        for tag in tags {
            if !product.has_tag(tag) {
                product.tags.push(tag.clone());
            }
        }
        Ok(())
    }

    async fn update_image_alt(&self, media_id: &str, alt: &str) -> Result<(), AdminShopifyError> {
        let mut products = lock(&self.products);
        let image = products
            .iter_mut()
            .flat_map(|p| p.images.iter_mut())
            .find(|i| i.id == media_id)
            .ok_or_else(|| AdminShopifyError::NotFound(media_id.to_string()))?;
        image.alt = Some(alt.to_string());
        Ok(())
    }

    async fn set_metafield(&self, input: &MetafieldInput) -> Result<(), AdminShopifyError> {
        lock(&self.metafields).push(input.clone());
        Ok(())
    }

    async fn shop_details(&self) -> Result<ShopDetails, AdminShopifyError> {
        Ok(ShopDetails {
            name: "Test Store".to_string(),
            myshopify_domain: test_shop().into_inner(),
            currency_code: "USD".to_string(),
            plan_name: "Basic".to_string(),
        })
    }

    async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, AdminShopifyError> {
        Ok(lock(&self.subscriptions).clone())
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Canned answer of [`ScriptedGenerator`].
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    RateLimited(u64),
    Blocked,
}

/// Generator answering by prompt substring, tracking peak concurrency.
#[derive(Debug)]
pub struct ScriptedGenerator {
    default: Reply,
    rules: Vec<(String, Reply)>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    /// Generator answering `default` to every prompt.
    #[must_use]
    pub fn new(default: Reply) -> Self {
        Self {
            default,
            rules: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Generator answering valid description JSON.
    #[must_use]
    pub fn descriptions() -> Self {
        Self::new(Reply::Text(
            r#"{"title": "Better title", "description_html": "<p>Better copy.</p>"}"#.to_string(),
        ))
    }

    /// Answer `reply` when the prompt contains `needle`.
    #[must_use]
    pub fn when(mut self, needle: &str, reply: Reply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    /// Sleep `delay` inside every call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map_or(&self.default, |(_, reply)| reply);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::RateLimited(secs) => Err(GeminiError::RateLimited(*secs)),
            Reply::Blocked => Err(GeminiError::Blocked("SAFETY".to_string())),
        }
    }
}
