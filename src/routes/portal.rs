use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::jobs::JobDetail;
use super::ValidJson;
use crate::auth::CurrentCustomer;
use crate::domain::aggregates::{Customer, Job};
use crate::services::jobs::{self as job_service, QuantityOverride};
use crate::store::JobFilter;
use crate::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/me/jobs", get(my_jobs))
        .route("/api/me/jobs/:id", get(my_job))
        .route("/api/reorders", post(request_reorder))
}

async fn me(CurrentCustomer(c): CurrentCustomer) -> Json<Customer> { Json(c) }

async fn my_jobs(State(s): State<AppState>, CurrentCustomer(c): CurrentCustomer) -> ApiResult<Json<Vec<Job>>> {
    Ok(Json(s.store.list_jobs(&JobFilter { customer_id: Some(c.id), ..Default::default() }).await?))
}

async fn my_job(State(s): State<AppState>, CurrentCustomer(c): CurrentCustomer, Path(id): Path<Uuid>) -> ApiResult<Json<JobDetail>> {
    let job = job_service::get_job(&s, id).await?;
    if job.customer_id != c.id { return Err(ApiError::NotFound("job")); }
    let events = s.store.list_job_events(id).await?;
    Ok(Json(JobDetail { job, events }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest { pub job_id: Uuid, #[serde(default)] pub items: Vec<QuantityOverride> }

async fn request_reorder(State(s): State<AppState>, CurrentCustomer(c): CurrentCustomer, ValidJson(r): ValidJson<ReorderRequest>) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = job_service::request_reorder(&s, c.id, r.job_id, &r.items).await?;
    Ok((StatusCode::CREATED, Json(job)))
}
