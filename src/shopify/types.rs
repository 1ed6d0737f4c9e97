//! Catalog types returned to storefront clients, and the raw Storefront API
//! shapes they are mapped from.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection { pub id: String, pub handle: String, pub title: String, pub products: Vec<Product> }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant { pub id: String, pub title: String, pub available: bool, pub price: String, pub currency: String }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine { pub variant_id: String, pub quantity: i32 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout { pub cart_id: String, pub checkout_url: String }

// ---------------------------------------------------------------------------
// Storefront API response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLResponse<T> { pub data: Option<T>, #[serde(default)] pub errors: Vec<GraphQLErrorBody> }

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLErrorBody { pub message: String }

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<T> { pub nodes: Vec<T> }

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionData { pub collection: Option<RawCollection> }

#[derive(Debug, Deserialize)]
pub(crate) struct RawCollection { pub id: String, pub handle: String, pub title: String, pub products: Nodes<RawProduct> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProduct { pub id: String, pub handle: String, pub title: String, #[serde(default)] pub description: String, pub featured_image: Option<RawImage>, pub variants: Nodes<RawVariant> }

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage { pub url: String }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawVariant { pub id: String, pub title: String, pub available_for_sale: bool, pub price: RawMoney }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMoney { pub amount: String, pub currency_code: String }

#[derive(Debug, Deserialize)]
pub(crate) struct ProductHandlesData { pub products: ProductPage }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductPage { pub page_info: PageInfo, pub nodes: Vec<HandleNode> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo { pub has_next_page: bool, pub end_cursor: Option<String> }

#[derive(Debug, Deserialize)]
pub(crate) struct HandleNode { pub handle: String }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartCreateData { pub cart_create: CartCreatePayload }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartCreatePayload { pub cart: Option<RawCart>, #[serde(default)] pub user_errors: Vec<GraphQLErrorBody> }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCart { pub id: String, pub checkout_url: String }

impl From<RawCollection> for Collection {
    fn from(c: RawCollection) -> Self {
        Self { id: c.id, handle: c.handle, title: c.title, products: c.products.nodes.into_iter().map(Product::from).collect() }
    }
}

impl From<RawProduct> for Product {
    fn from(p: RawProduct) -> Self {
        Self {
            id: p.id, handle: p.handle, title: p.title, description: p.description,
            image_url: p.featured_image.map(|i| i.url),
            variants: p.variants.nodes.into_iter().map(|v| Variant { id: v.id, title: v.title, available: v.available_for_sale, price: v.price.amount, currency: v.price.currency_code }).collect(),
        }
    }
}
