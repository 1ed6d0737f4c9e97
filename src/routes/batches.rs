use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::domain::aggregates::{Batch, BatchStatus, PurchaseOrder};
use crate::services::batches as batch_service;
use crate::store::BatchFilter;
use crate::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/batches", get(list_batches).post(open_batch))
        .route("/api/batches/:id", get(get_batch))
        .route("/api/batches/:id/jobs", post(add_job))
        .route("/api/batches/:id/close", post(close_batch))
        .route("/api/batches/:id/cancel", post(cancel_batch))
        .route("/api/batches/:id/order", post(order_batch))
        .route("/api/batches/:id/receive", post(receive_batch))
        .route("/api/batches/:id/purchase-order", get(purchase_order))
}

#[derive(Debug, Deserialize)] pub struct BatchListParams { pub collection_id: Option<String>, pub status: Option<String> }

async fn list_batches(State(s): State<AppState>, Query(p): Query<BatchListParams>) -> ApiResult<Json<Vec<Batch>>> {
    let status = p.status.as_deref()
        .map(|st| BatchStatus::parse(st).ok_or_else(|| ApiError::BadRequest(format!("unknown batch status {st:?}"))))
        .transpose()?;
    Ok(Json(s.store.list_batches(&BatchFilter { collection_id: p.collection_id, status }).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct OpenBatchRequest {
    #[validate(length(min = 1))]
    pub collection_id: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 365))]
    pub period_days: Option<i64>,
}

async fn open_batch(State(s): State<AppState>, ValidJson(r): ValidJson<OpenBatchRequest>) -> ApiResult<(StatusCode, Json<Batch>)> {
    let start = r.period_start.unwrap_or_else(Utc::now);
    let end = r.period_end.unwrap_or_else(|| start + Duration::days(r.period_days.unwrap_or(7)));
    Ok((StatusCode::CREATED, Json(batch_service::open_batch(&s, &r.collection_id, start, end).await?)))
}

async fn get_batch(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::get_batch(&s, id).await?))
}

#[derive(Debug, Deserialize, Validate)] pub struct AddJobRequest { pub job_id: Uuid }

async fn add_job(State(s): State<AppState>, Path(id): Path<Uuid>, ValidJson(r): ValidJson<AddJobRequest>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::add_job(&s, id, r.job_id).await?))
}

async fn close_batch(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::close(&s, id).await?))
}

async fn cancel_batch(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::cancel(&s, id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderRequest { #[validate(length(min = 1, max = 64))] pub purchase_order_number: String }

async fn order_batch(State(s): State<AppState>, Path(id): Path<Uuid>, ValidJson(r): ValidJson<OrderRequest>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::mark_ordered(&s, id, &r.purchase_order_number).await?))
}

async fn receive_batch(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Batch>> {
    Ok(Json(batch_service::mark_received(&s, id).await?))
}

async fn purchase_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<PurchaseOrder>> {
    Ok(Json(batch_service::purchase_order(&s, id).await?))
}
