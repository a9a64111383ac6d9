//! Domain types returned by the Admin API client.
//!
//! These are flattened from the GraphQL response shapes so callers never see
//! connection/edge wrappers.

use serde::Serialize;

/// Snapshot of the product fields the copywriting pipelines read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    /// Global ID, e.g. `gid://shopify/Product/123`.
    pub id: String,
    pub title: String,
    pub description_html: String,
    pub product_type: String,
    pub vendor: String,
    pub tags: Vec<String>,
    pub images: Vec<ProductImage>,
}

impl ProductSnapshot {
    /// Whether the product carries `tag` (case-insensitive, like Shopify search).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductImage {
    /// Media ID, e.g. `gid://shopify/MediaImage/456`.
    pub id: String,
    pub url: String,
    pub alt: Option<String>,
}

/// New title and/or description for a product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductContentUpdate {
    pub id: String,
    pub title: Option<String>,
    pub description_html: Option<String>,
}

/// A product metafield write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldInput {
    pub owner_id: String,
    pub namespace: String,
    pub key: String,
    /// Shopify metafield type, e.g. `json` or `single_line_text_field`.
    pub value_type: String,
    pub value: String,
}

/// Basic shop metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopDetails {
    pub name: String,
    pub myshopify_domain: String,
    pub currency_code: String,
    pub plan_name: String,
}

/// An app subscription on the current installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSubscription {
    pub id: String,
    /// Plan name as created by the app, e.g. `Starter`.
    pub name: String,
    /// Subscription status, e.g. `ACTIVE`.
    pub status: String,
    pub test: bool,
}

/// Normalize a product reference to a global ID.
///
/// Accepts either a bare numeric ID or a `gid://shopify/Product/...` ID.
#[must_use]
pub fn product_gid(id: &str) -> Option<String> {
    let id = id.trim();
    if let Some(numeric) = id.strip_prefix("gid://shopify/Product/") {
        return is_numeric(numeric).then(|| id.to_string());
    }
    is_numeric(id).then(|| format!("gid://shopify/Product/{id}"))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
