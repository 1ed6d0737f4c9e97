use axum::{extract::{Path, State}, http::header, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ValidJson;
use crate::domain::aggregates::DropShop;
use crate::shopify::{Checkout, CheckoutLine, Collection};
use crate::sitemap::build_sitemap;
use crate::theme::Theme;
use crate::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/api/shops/:slug", get(shop_page))
        .route("/api/checkout", post(checkout))
}

#[derive(Debug, Serialize)] pub struct ShopPage { pub shop: DropShop, pub theme: Theme, pub collection: Collection }

async fn shop_page(State(s): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<ShopPage>> {
    let shop = s.store.get_drop_shop(&slug.to_lowercase()).await?.ok_or(ApiError::NotFound("drop shop"))?;
    let collection = s.storefront.collection_products(&shop.collection_handle).await?;
    let theme = Theme::build(&shop.theme_color, shop.theme_mode);
    Ok(Json(ShopPage { shop, theme, collection }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 100, message = "checkout needs 1-100 lines"))]
    pub lines: Vec<CheckoutLine>,
    pub drop_shop: Option<String>,
}

async fn checkout(State(s): State<AppState>, ValidJson(r): ValidJson<CheckoutRequest>) -> ApiResult<Json<Checkout>> {
    if let Some(bad) = r.lines.iter().find(|l| l.variant_id.trim().is_empty() || !(1..=100).contains(&l.quantity)) {
        return Err(ApiError::BadRequest(format!("invalid checkout line for variant {:?}", bad.variant_id)));
    }
    let mut attributes = Vec::new();
    if let Some(slug) = &r.drop_shop {
        let shop = s.store.get_drop_shop(slug).await?.ok_or(ApiError::NotFound("drop shop"))?;
        attributes.push(("drop_shop".to_string(), shop.slug.to_string()));
    }
    let checkout = s.storefront.create_checkout(&r.lines, &attributes).await?;
    tracing::info!(cart_id = %checkout.cart_id, lines = r.lines.len(), "checkout created");
    Ok(Json(checkout))
}

async fn sitemap(State(s): State<AppState>) -> ApiResult<impl IntoResponse> {
    let shops = s.store.list_drop_shops().await?;
    let handles = s.storefront.product_handles().await?;
    let xml = build_sitemap(&s.config.site_url, shops.iter().map(|sh| sh.slug.as_str()), handles.iter().map(String::as_str));
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}
