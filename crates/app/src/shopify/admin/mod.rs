//! Shopify Admin API GraphQL client authenticated with an offline token.
//!
//! This module provides a type-safe client for the handful of Admin API
//! operations the app needs: product reads, content and tag mutations, image
//! alt text, metafields, and the current app installation's subscriptions.

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use shelfwise_core::ShopDomain;
use tracing::instrument;

use super::{
    AdminShopifyError, CommerceAdmin, GraphQLError, GraphQLErrorLocation, THROTTLED_RETRY_SECS,
    types::{
        AppSubscription, MetafieldInput, ProductContentUpdate, ProductImage, ProductSnapshot,
        ShopDetails,
    },
};

pub mod queries;

use queries::{
    CurrentAppInstallation, FileUpdate, GetProduct, GetProducts, MetafieldsSet, ProductNode,
    ProductUpdate, ShopInfo, TagsAdd, UserError,
};

/// Largest page requested from the `products` connection.
const PAGE_SIZE: usize = 50;
/// Upper bound on pages walked for one selection.
const MAX_PAGES: usize = 20;

/// Shopify Admin API GraphQL client for one shop.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
    #[serde(default)]
    extensions: Option<GraphQLErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorExtensions {
    code: Option<String>,
}

impl AdminClient {
    /// Create a client for `shop` using its offline access token.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        shop: &ShopDomain,
        api_version: &str,
        access_token: SecretString,
    ) -> Self {
        let endpoint = format!("https://{shop}/admin/api/{api_version}/graphql.json");
        Self::with_endpoint(client, endpoint, access_token)
    }

    /// Create a client posting to an explicit GraphQL endpoint.
    #[must_use]
    pub fn with_endpoint(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client,
                endpoint: endpoint.into(),
                access_token,
            }),
        }
    }

    /// The GraphQL endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map_or(THROTTLED_RETRY_SECS, seconds_ceil);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let response = response.error_for_status()?;
        let graphql_response: GraphQLResponse<Q::ResponseData> =
            serde_json::from_slice(&response.bytes().await?)?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                    code: e.extensions.and_then(|x| x.code),
                })
                .collect();

            if converted_errors
                .iter()
                .any(|e| e.code.as_deref() == Some("THROTTLED"))
            {
                return Err(AdminShopifyError::RateLimited(THROTTLED_RETRY_SECS));
            }
            return Err(AdminShopifyError::GraphQL(converted_errors));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
                code: None,
            }])
        })
    }
}

impl CommerceAdmin for AdminClient {
    #[instrument(skip(self), fields(endpoint = %self.inner.endpoint))]
    async fn products_without_tag(
        &self,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<ProductSnapshot>, AdminShopifyError> {
        let query = format!("tag_not:'{}'", tag.replace('\'', "\\'"));
        let mut products = Vec::new();
        let mut after = None;

        for _ in 0..MAX_PAGES {
            if products.len() >= limit {
                break;
            }
            let first = (limit - products.len()).min(PAGE_SIZE);
            let variables = queries::get_products::Variables {
                first: i64::try_from(first).unwrap_or(50),
                after: after.take(),
                query: Some(query.clone()),
            };

            let page = self.execute::<GetProducts>(variables).await?.products;

            // The search index lags behind writes, so recently tagged
            // products can still match the query.
            products.extend(
                page.edges
                    .into_iter()
                    .map(|edge| convert_product(edge.node))
                    .filter(|p| !p.has_tag(tag)),
            );

            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor;
        }

        products.truncate(limit);
        tracing::debug!(count = products.len(), "Selected untagged products");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &str) -> Result<Option<ProductSnapshot>, AdminShopifyError> {
        let variables = queries::get_product::Variables { id: id.to_string() };
        let response = self.execute::<GetProduct>(variables).await?;
        Ok(response.product.map(convert_product))
    }

    #[instrument(skip(self, update), fields(product_id = %update.id))]
    async fn update_product(&self, update: &ProductContentUpdate) -> Result<(), AdminShopifyError> {
        let variables = queries::product_update::Variables {
            product: queries::product_update::ProductUpdateInput {
                id: update.id.clone(),
                title: update.title.clone(),
                description_html: update.description_html.clone(),
            },
        };

        let payload = self
            .execute::<ProductUpdate>(variables)
            .await?
            .product_update
            .ok_or_else(|| AdminShopifyError::NotFound(update.id.clone()))?;
        check_user_errors(&payload.user_errors)?;

        if payload.product.is_none() {
            return Err(AdminShopifyError::NotFound(update.id.clone()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn add_tags(&self, id: &str, tags: &[String]) -> Result<(), AdminShopifyError> {
        let variables = queries::tags_add::Variables {
            id: id.to_string(),
            tags: tags.to_vec(),
        };

        let payload = self
            .execute::<TagsAdd>(variables)
            .await?
            .tags_add
            .ok_or_else(|| AdminShopifyError::NotFound(id.to_string()))?;
        check_user_errors(&payload.user_errors)?;

        if payload.node.is_none() {
            return Err(AdminShopifyError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, alt), fields(media_id = %media_id))]
    async fn update_image_alt(&self, media_id: &str, alt: &str) -> Result<(), AdminShopifyError> {
        let variables = queries::file_update::Variables {
            files: vec![queries::file_update::FileUpdateInput {
                id: media_id.to_string(),
                alt: alt.to_string(),
            }],
        };

        let payload = self
            .execute::<FileUpdate>(variables)
            .await?
            .file_update
            .ok_or_else(|| AdminShopifyError::NotFound(media_id.to_string()))?;
        check_user_errors(&payload.user_errors)
    }

    #[instrument(skip(self, input), fields(owner_id = %input.owner_id, key = %input.key))]
    async fn set_metafield(&self, input: &MetafieldInput) -> Result<(), AdminShopifyError> {
        let variables = queries::metafields_set::Variables {
            metafields: vec![queries::metafields_set::MetafieldsSetInput {
                owner_id: input.owner_id.clone(),
                namespace: input.namespace.clone(),
                key: input.key.clone(),
                value_type: input.value_type.clone(),
                value: input.value.clone(),
            }],
        };

        let payload = self
            .execute::<MetafieldsSet>(variables)
            .await?
            .metafields_set
            .ok_or_else(|| AdminShopifyError::NotFound(input.owner_id.clone()))?;
        check_user_errors(&payload.user_errors)
    }

    #[instrument(skip(self))]
    async fn shop_details(&self) -> Result<ShopDetails, AdminShopifyError> {
        let shop = self
            .execute::<ShopInfo>(queries::shop_info::Variables)
            .await?
            .shop;

        Ok(ShopDetails {
            name: shop.name,
            myshopify_domain: shop.myshopify_domain,
            currency_code: shop.currency_code,
            plan_name: shop.plan.display_name,
        })
    }

    #[instrument(skip(self))]
    async fn active_subscriptions(&self) -> Result<Vec<AppSubscription>, AdminShopifyError> {
        let installation = self
            .execute::<CurrentAppInstallation>(queries::current_app_installation::Variables)
            .await?
            .current_app_installation;

        Ok(installation
            .active_subscriptions
            .into_iter()
            .map(|s| AppSubscription {
                id: s.id,
                name: s.name,
                status: s.status,
                test: s.test,
            })
            .collect())
    }
}

/// Turn mutation user errors into `AdminShopifyError::UserError`.
fn check_user_errors(errors: &[UserError]) -> Result<(), AdminShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(AdminShopifyError::UserError(message))
}

fn convert_product(node: ProductNode) -> ProductSnapshot {
    let images = node
        .media
        .edges
        .into_iter()
        .filter_map(|edge| {
            let media = edge.node;
            if media.typename != "MediaImage" {
                return None;
            }
            Some(ProductImage {
                id: media.id?,
                url: media.image?.url,
                alt: media.alt.filter(|a| !a.trim().is_empty()),
            })
        })
        .collect();

    ProductSnapshot {
        id: node.id,
        title: node.title,
        description_html: node.description_html,
        product_type: node.product_type,
        vendor: node.vendor,
        tags: node.tags,
        images,
    }
}

/// Round a possibly fractional `Retry-After` value up to whole seconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_ceil(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.ceil() as u64
    } else {
        THROTTLED_RETRY_SECS
    }
}
