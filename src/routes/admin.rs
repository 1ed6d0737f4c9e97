use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::domain::aggregates::{Customer, DropShop, Session, ThemeMode};
use crate::domain::value_objects::{HexColor, Slug};
use crate::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/customers", get(list_customers).post(create_customer))
        .route("/api/admin/customers/:id/sessions", post(issue_session))
        .route("/api/admin/drop-shops", get(list_drop_shops).post(create_drop_shop))
        .route("/api/admin/drop-shops/:slug", get(get_drop_shop).put(update_drop_shop))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest { #[validate(length(min = 1, max = 200))] pub name: String, #[validate(email)] pub email: String }

async fn create_customer(State(s): State<AppState>, ValidJson(r): ValidJson<CreateCustomerRequest>) -> ApiResult<(StatusCode, Json<Customer>)> {
    let c = Customer::create(&r.name, &r.email)?;
    s.store.insert_customer(&c).await?;
    tracing::info!(customer_id = %c.id, name = %c.full_name(), "customer created");
    Ok((StatusCode::CREATED, Json(c)))
}

async fn list_customers(State(s): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(s.store.list_customers().await?))
}

async fn issue_session(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<(StatusCode, Json<Session>)> {
    let c = s.store.get_customer(id).await?.ok_or(ApiError::NotFound("customer"))?;
    let session = Session::issue(c.id, s.config.session_ttl);
    s.store.insert_session(&session).await?;
    tracing::info!(customer_id = %c.id, expires_at = %session.expires_at, "portal session issued");
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DropShopRequest {
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1))]
    pub collection_id: String,
    #[validate(length(min = 1))]
    pub collection_handle: String,
    pub theme_color: String,
    #[serde(default)]
    pub theme_mode: ThemeMode,
    pub batch_cadence_days: Option<i32>,
}

async fn create_drop_shop(State(s): State<AppState>, ValidJson(r): ValidJson<DropShopRequest>) -> ApiResult<(StatusCode, Json<DropShop>)> {
    let slug = Slug::new(r.slug.as_deref().ok_or_else(|| ApiError::BadRequest("slug is required".into()))?)?;
    let mut shop = DropShop::create(slug, r.title, r.collection_id, r.collection_handle, HexColor::new(&r.theme_color)?, r.theme_mode)?;
    shop.set_cadence(r.batch_cadence_days)?;
    s.store.insert_drop_shop(&shop).await?;
    tracing::info!(shop = %shop.slug, collection_id = %shop.collection_id, "drop shop created");
    Ok((StatusCode::CREATED, Json(shop)))
}

async fn list_drop_shops(State(s): State<AppState>) -> ApiResult<Json<Vec<DropShop>>> {
    Ok(Json(s.store.list_drop_shops().await?))
}

async fn get_drop_shop(State(s): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<DropShop>> {
    s.store.get_drop_shop(&slug).await?.map(Json).ok_or(ApiError::NotFound("drop shop"))
}

/// Replaces the shop's settings. The slug is fixed once created.
async fn update_drop_shop(State(s): State<AppState>, Path(slug): Path<String>, ValidJson(r): ValidJson<DropShopRequest>) -> ApiResult<Json<DropShop>> {
    let mut shop = s.store.get_drop_shop(&slug).await?.ok_or(ApiError::NotFound("drop shop"))?;
    if r.slug.as_deref().is_some_and(|new| new != shop.slug.as_str()) { return Err(ApiError::BadRequest("slug cannot be changed".into())); }
    let title = r.title.trim();
    if title.is_empty() { return Err(ApiError::BadRequest("title must not be blank".into())); }
    shop.title = title.to_string();
    shop.collection_id = r.collection_id;
    shop.collection_handle = r.collection_handle;
    shop.theme_color = HexColor::new(&r.theme_color)?;
    shop.theme_mode = r.theme_mode;
    shop.set_cadence(r.batch_cadence_days)?;
    s.store.update_drop_shop(&shop).await?;
    Ok(Json(shop))
}
