//! Tier resolution from the shop's active app subscription.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use shelfwise_core::{ShopDomain, TierDefinition, catalog};
use tracing::instrument;

use crate::shopify::{AdminShopifyError, AppSubscription, CommerceAdmin};

const MAX_CACHED_SHOPS: u64 = 10_000;

/// Resolves the subscription tier a shop is currently on.
pub trait PlanResolver: Send + Sync {
    /// Tier for `shop`, queried through that shop's Admin API client.
    fn resolve<A: CommerceAdmin>(
        &self,
        shop: &ShopDomain,
        admin: &A,
    ) -> impl Future<Output = Result<&'static TierDefinition, AdminShopifyError>> + Send;

    /// Forget anything cached for `shop` (e.g. after uninstall).
    fn invalidate(&self, shop: &ShopDomain) -> impl Future<Output = ()> + Send;
}

/// Production resolver: reads `currentAppInstallation.activeSubscriptions`
/// and caches the result per shop for a short TTL.
#[derive(Clone)]
pub struct SubscriptionPlanResolver {
    cache: Cache<ShopDomain, &'static TierDefinition>,
}

impl SubscriptionPlanResolver {
    /// Create a resolver caching each shop's tier for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_CACHED_SHOPS)
                .time_to_live(ttl)
                .build(),
        }
    }
}

impl PlanResolver for SubscriptionPlanResolver {
    #[instrument(skip(self, admin), fields(shop = %shop))]
    async fn resolve<A: CommerceAdmin>(
        &self,
        shop: &ShopDomain,
        admin: &A,
    ) -> Result<&'static TierDefinition, AdminShopifyError> {
        if let Some(tier) = self.cache.get(shop).await {
            return Ok(tier);
        }

        let subscriptions = admin.active_subscriptions().await?;
        let tier = tier_for_subscriptions(&subscriptions);
        tracing::debug!(tier = tier.name, "Resolved subscription tier");

        self.cache.insert(shop.clone(), tier).await;
        Ok(tier)
    }

    async fn invalidate(&self, shop: &ShopDomain) {
        self.cache.invalidate(shop).await;
    }
}

/// Resolver that always answers the same tier.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlanResolver(pub &'static TierDefinition);

impl PlanResolver for FixedPlanResolver {
    async fn resolve<A: CommerceAdmin>(
        &self,
        _shop: &ShopDomain,
        _admin: &A,
    ) -> Result<&'static TierDefinition, AdminShopifyError> {
        Ok(self.0)
    }

    async fn invalidate(&self, _shop: &ShopDomain) {}
}

/// Map active subscriptions to a catalog tier.
///
/// No active subscription means the default (free) tier. A subscription whose
/// plan name matches no tier resolves to the restricted fallback.
#[must_use]
pub fn tier_for_subscriptions(subscriptions: &[AppSubscription]) -> &'static TierDefinition {
    let Some(active) = subscriptions
        .iter()
        .find(|s| s.status.eq_ignore_ascii_case("ACTIVE"))
    else {
        return catalog::resolve(catalog::DEFAULT_TIER);
    };

    tier_for_plan_name(&active.name)
}

/// Match a plan name such as `Professional` or `Shelfwise Starter` to a tier.
#[must_use]
pub fn tier_for_plan_name(name: &str) -> &'static TierDefinition {
    catalog::lookup(name)
        .or_else(|| name.split_whitespace().find_map(catalog::lookup))
        .unwrap_or(&catalog::RESTRICTED)
}
