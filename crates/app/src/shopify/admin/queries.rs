//! GraphQL operation definitions for the Shopify Admin API.
//!
//! Each operation pairs a document under `graphql/admin/queries/` with the
//! variable and response shapes it uses, and implements
//! [`graphql_client::GraphQLQuery`] so it runs through the client's generic
//! `execute`. Only the fields this app reads are declared.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

const PRODUCTS_DOCUMENT: &str = include_str!("../../../graphql/admin/queries/products.graphql");
const SHOP_DOCUMENT: &str = include_str!("../../../graphql/admin/queries/shop.graphql");

macro_rules! operation {
    ($name:ident, $module:ident, $document:expr) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: stringify!($name),
                }
            }
        }
    };
}

operation!(GetProducts, get_products, PRODUCTS_DOCUMENT);
operation!(GetProduct, get_product, PRODUCTS_DOCUMENT);
operation!(ProductUpdate, product_update, PRODUCTS_DOCUMENT);
operation!(TagsAdd, tags_add, PRODUCTS_DOCUMENT);
operation!(FileUpdate, file_update, PRODUCTS_DOCUMENT);
operation!(MetafieldsSet, metafields_set, PRODUCTS_DOCUMENT);
operation!(ShopInfo, shop_info, SHOP_DOCUMENT);
operation!(CurrentAppInstallation, current_app_installation, SHOP_DOCUMENT);

// =============================================================================
// Shared response shapes
// =============================================================================

/// Product fields selected by `GetProducts` and `GetProduct`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description_html: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub media: MediaConnection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConnection {
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEdge {
    pub node: MediaNode,
}

/// A media node; only `MediaImage` nodes carry `id`, `alt` and `image`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaNode {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub id: Option<String>,
    pub alt: Option<String>,
    pub image: Option<ImageNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageNode {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A mutation user error.
#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdNode {
    pub id: String,
}

// =============================================================================
// Product queries
// =============================================================================

pub mod get_products {
    use super::{Deserialize, PageInfo, ProductNode, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
        pub query: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub products: ProductConnection,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductConnection {
        pub edges: Vec<ProductEdge>,
        pub page_info: PageInfo,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ProductEdge {
        pub node: ProductNode,
    }
}

pub mod get_product {
    use super::{Deserialize, ProductNode, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub product: Option<ProductNode>,
    }
}

// =============================================================================
// Product mutations
// =============================================================================

pub mod product_update {
    use super::{Deserialize, IdNode, Serialize, UserError};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub product: ProductUpdateInput,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductUpdateInput {
        pub id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description_html: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_update: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub product: Option<IdNode>,
        pub user_errors: Vec<UserError>,
    }
}

pub mod tags_add {
    use super::{Deserialize, IdNode, Serialize, UserError};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
        pub tags: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub tags_add: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub node: Option<IdNode>,
        pub user_errors: Vec<UserError>,
    }
}

pub mod file_update {
    use super::{Deserialize, IdNode, Serialize, UserError};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub files: Vec<FileUpdateInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct FileUpdateInput {
        pub id: String,
        pub alt: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub file_update: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub files: Option<Vec<IdNode>>,
        pub user_errors: Vec<UserError>,
    }
}

pub mod metafields_set {
    use super::{Deserialize, IdNode, Serialize, UserError};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub metafields: Vec<MetafieldsSetInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MetafieldsSetInput {
        pub owner_id: String,
        pub namespace: String,
        pub key: String,
        #[serde(rename = "type")]
        pub value_type: String,
        pub value: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafields_set: Option<Payload>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub metafields: Option<Vec<IdNode>>,
        pub user_errors: Vec<UserError>,
    }
}

// =============================================================================
// Shop queries
// =============================================================================

pub mod shop_info {
    use super::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables;

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Shop {
        pub name: String,
        pub myshopify_domain: String,
        pub currency_code: String,
        pub plan: ShopPlan,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ShopPlan {
        pub display_name: String,
    }
}

pub mod current_app_installation {
    use super::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub current_app_installation: Installation,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Installation {
        pub active_subscriptions: Vec<Subscription>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Subscription {
        pub id: String,
        pub name: String,
        pub status: String,
        #[serde(default)]
        pub test: bool,
    }
}
