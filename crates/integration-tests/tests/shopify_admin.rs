//! Shopify Admin GraphQL client against a `wiremock` server.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use shelfwise_app::billing::{PlanResolver, SubscriptionPlanResolver};
use shelfwise_app::shopify::{
    AdminClient, AdminShopifyError, CommerceAdmin, MetafieldInput, ProductContentUpdate,
};
use shelfwise_integration_tests::test_shop;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GRAPHQL_PATH: &str = "/admin/api/2025-10/graphql.json";

fn client(server: &MockServer) -> AdminClient {
    AdminClient::with_endpoint(
        reqwest::Client::new(),
        format!("{}{GRAPHQL_PATH}", server.uri()),
        SecretString::from("shpat_test_token"),
    )
}

fn product_node(n: u32, tags: &[&str]) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{n}"),
        "title": format!("Product {n}"),
        "descriptionHtml": "<p>Old</p>",
        "productType": "Mug",
        "vendor": "Acme",
        "tags": tags,
        "media": {"edges": [
            {"node": {
                "__typename": "MediaImage",
                "id": format!("gid://shopify/MediaImage/{n}"),
                "alt": "",
                "image": {"url": format!("https://cdn.example.com/{n}.png")}
            }},
            {"node": {"__typename": "Video"}}
        ]}
    })
}

fn products_page(nodes: Vec<Value>, next: Option<&str>) -> Value {
    json!({"data": {"products": {
        "edges": nodes.into_iter().map(|node| json!({"node": node})).collect::<Vec<_>>(),
        "pageInfo": {"hasNextPage": next.is_some(), "endCursor": next}
    }}})
}

// =============================================================================
// Query Tests
// =============================================================================

#[tokio::test]
async fn test_products_without_tag_pages_and_filters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-Shopify-Access-Token", "shpat_test_token"))
        .and(body_partial_json(json!({
            "operationName": "GetProducts",
            "variables": {"after": null, "query": "tag_not:'ai-optimized'"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            vec![product_node(1, &[]), product_node(2, &["AI-Optimized"])],
            Some("cursor-1"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "operationName": "GetProducts",
            "variables": {"after": "cursor-1"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            vec![product_node(3, &["sale"])],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let products = client(&server)
        .products_without_tag("ai-optimized", 10)
        .await
        .unwrap();

    // Product 2 still matched the lagging search index but carries the tag.
    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["gid://shopify/Product/1", "gid://shopify/Product/3"]);

    let first = &products[0];
    assert_eq!(first.images.len(), 1);
    assert_eq!(first.images[0].id, "gid://shopify/MediaImage/1");
    assert_eq!(first.images[0].alt, None);
}

#[tokio::test]
async fn test_products_without_tag_stops_at_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "operationName": "GetProducts",
            "variables": {"first": 2}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            vec![product_node(1, &[]), product_node(2, &[])],
            Some("cursor-1"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let products = client(&server)
        .products_without_tag("ai-optimized", 2)
        .await
        .unwrap();
    assert_eq!(products.len(), 2);
}

#[tokio::test]
async fn test_missing_product_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({"operationName": "GetProduct"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"product": null}})))
        .mount(&server)
        .await;

    let product = client(&server)
        .product("gid://shopify/Product/404")
        .await
        .unwrap();
    assert!(product.is_none());
}

// =============================================================================
// Throttling and Error Tests
// =============================================================================

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "4.5"))
        .mount(&server)
        .await;

    let result = client(&server).product("gid://shopify/Product/1").await;
    assert!(matches!(result, Err(AdminShopifyError::RateLimited(5))));
}

#[tokio::test]
async fn test_graphql_throttled_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .products_without_tag("ai-optimized", 5)
        .await
        .unwrap_err();
    assert!(err.retry_after().is_some());
}

#[tokio::test]
async fn test_other_graphql_errors_are_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{
                "message": "Field 'bogus' doesn't exist",
                "locations": [{"line": 3, "column": 5}],
                "extensions": {"code": "undefinedField"}
            }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .product("gid://shopify/Product/1")
        .await
        .unwrap_err();
    match err {
        AdminShopifyError::GraphQL(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].locations[0].line, 3);
            assert_eq!(errors[0].code.as_deref(), Some("undefinedField"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).shop_details().await;
    assert!(matches!(result, Err(AdminShopifyError::Unauthorized(_))));
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[tokio::test]
async fn test_update_product_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "operationName": "ProductUpdate",
            "variables": {"product": {"id": "gid://shopify/Product/1", "title": "New title"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"productUpdate": {
            "product": {"id": "gid://shopify/Product/1"},
            "userErrors": []
        }}})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update_product(&ProductContentUpdate {
            id: "gid://shopify/Product/1".to_string(),
            title: Some("New title".to_string()),
            description_html: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_user_errors_become_user_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({"operationName": "TagsAdd"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"tagsAdd": {
            "node": null,
            "userErrors": [{"field": ["id"], "message": "Product does not exist"}]
        }}})))
        .mount(&server)
        .await;

    let err = client(&server)
        .add_tags("gid://shopify/Product/9", &["ai-optimized".to_string()])
        .await
        .unwrap_err();
    match err {
        AdminShopifyError::UserError(message) => {
            assert_eq!(message, "id: Product does not exist");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_set_metafield_and_image_alt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "operationName": "MetafieldsSet",
            "variables": {"metafields": [{
                "ownerId": "gid://shopify/Product/1",
                "namespace": "shelfwise",
                "key": "ad_copy",
                "type": "json"
            }]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"metafieldsSet": {
            "metafields": [{"id": "gid://shopify/Metafield/1"}],
            "userErrors": []
        }}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({
            "operationName": "FileUpdate",
            "variables": {"files": [{"id": "gid://shopify/MediaImage/1", "alt": "Blue mug"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"fileUpdate": {
            "files": [{"id": "gid://shopify/MediaImage/1"}],
            "userErrors": []
        }}})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = client(&server);
    admin
        .set_metafield(&MetafieldInput {
            owner_id: "gid://shopify/Product/1".to_string(),
            namespace: "shelfwise".to_string(),
            key: "ad_copy".to_string(),
            value_type: "json".to_string(),
            value: r#"{"headline":"Hi"}"#.to_string(),
        })
        .await
        .unwrap();
    admin
        .update_image_alt("gid://shopify/MediaImage/1", "Blue mug")
        .await
        .unwrap();
}

// =============================================================================
// Subscription Tests
// =============================================================================

#[tokio::test]
async fn test_plan_resolver_reads_and_caches_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({"operationName": "CurrentAppInstallation"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "currentAppInstallation": {"activeSubscriptions": [{
                "id": "gid://shopify/AppSubscription/7",
                "name": "Shelfwise Starter",
                "status": "ACTIVE",
                "test": true
            }]}
        }})))
        .expect(1)
        .mount(&server)
        .await;

    let admin = client(&server);
    let resolver = SubscriptionPlanResolver::new(Duration::from_secs(60));
    let shop = test_shop();

    let tier = resolver.resolve(&shop, &admin).await.unwrap();
    assert_eq!(tier.name, "starter");
    let tier = resolver.resolve(&shop, &admin).await.unwrap();
    assert_eq!(tier.name, "starter");
}

#[tokio::test]
async fn test_no_subscription_means_free() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "currentAppInstallation": {"activeSubscriptions": []}
        }})))
        .mount(&server)
        .await;

    let admin = client(&server);
    assert!(admin.active_subscriptions().await.unwrap().is_empty());

    let tier = SubscriptionPlanResolver::new(Duration::from_secs(60))
        .resolve(&test_shop(), &admin)
        .await
        .unwrap();
    assert_eq!(tier.name, "free");
}
