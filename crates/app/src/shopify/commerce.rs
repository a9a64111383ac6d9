//! Narrow commerce-platform interface used by the copywriting pipelines.

use std::future::Future;

use super::AdminShopifyError;
use super::types::{
    AppSubscription, MetafieldInput, ProductContentUpdate, ProductSnapshot, ShopDetails,
};

/// Operations the app performs against a shop's catalog.
///
/// Implemented by [`super::AdminClient`]; tests substitute an in-memory store.
pub trait CommerceAdmin: Send + Sync {
    /// Up to `limit` products that do not carry `tag`.
    fn products_without_tag(
        &self,
        tag: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ProductSnapshot>, AdminShopifyError>> + Send;

    /// A single product by global ID.
    fn product(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ProductSnapshot>, AdminShopifyError>> + Send;

    /// Replace title and/or description.
    fn update_product(
        &self,
        update: &ProductContentUpdate,
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    /// Add tags to a product, keeping existing ones.
    fn add_tags(
        &self,
        id: &str,
        tags: &[String],
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    /// Set the alt text of a product image.
    fn update_image_alt(
        &self,
        media_id: &str,
        alt: &str,
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    /// Write a metafield.
    fn set_metafield(
        &self,
        input: &MetafieldInput,
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    /// Shop name, currency and plan.
    fn shop_details(&self) -> impl Future<Output = Result<ShopDetails, AdminShopifyError>> + Send;

    /// Active subscriptions of the current app installation.
    fn active_subscriptions(
        &self,
    ) -> impl Future<Output = Result<Vec<AppSubscription>, AdminShopifyError>> + Send;
}
