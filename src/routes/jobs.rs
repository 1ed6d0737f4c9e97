use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::domain::aggregates::{Job, JobStatus};
use crate::domain::events::JobEvent;
use crate::services::jobs::{self as job_service, NewJob};
use crate::store::JobFilter;
use crate::{ApiError, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", get(list_jobs).post(create_job))
        .route("/api/jobs/:id", get(get_job))
        .route("/api/jobs/:id/status", put(update_status))
        .route("/api/jobs/:id/events", get(list_events))
        .route("/api/jobs/:id/notes", post(add_note))
}

#[derive(Debug, Serialize)]
pub struct JobDetail { #[serde(flatten)] pub job: Job, pub events: Vec<JobEvent> }

#[derive(Debug, Deserialize)]
pub struct JobListParams { pub customer_id: Option<Uuid>, pub status: Option<String>, pub collection_id: Option<String>, pub batch_id: Option<Uuid> }

pub(crate) fn parse_status(s: &str) -> ApiResult<JobStatus> {
    JobStatus::parse(s).ok_or_else(|| ApiError::BadRequest(format!("unknown job status {s:?}")))
}

async fn list_jobs(State(s): State<AppState>, Query(p): Query<JobListParams>) -> ApiResult<Json<Vec<Job>>> {
    let filter = JobFilter { customer_id: p.customer_id, status: p.status.as_deref().map(parse_status).transpose()?, collection_id: p.collection_id, batch_id: p.batch_id };
    Ok(Json(s.store.list_jobs(&filter).await?))
}

async fn create_job(State(s): State<AppState>, ValidJson(r): ValidJson<NewJob>) -> ApiResult<(StatusCode, Json<Job>)> {
    Ok((StatusCode::CREATED, Json(job_service::create_job(&s, r).await?)))
}

async fn get_job(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<JobDetail>> {
    let job = job_service::get_job(&s, id).await?;
    let events = s.store.list_job_events(id).await?;
    Ok(Json(JobDetail { job, events }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest { #[validate(length(min = 1))] pub status: String, #[validate(length(max = 2000))] pub note: Option<String> }

async fn update_status(State(s): State<AppState>, Path(id): Path<Uuid>, ValidJson(r): ValidJson<StatusRequest>) -> ApiResult<Json<Job>> {
    let status = parse_status(&r.status)?;
    Ok(Json(job_service::change_status(&s, id, status, r.note.as_deref()).await?))
}

async fn list_events(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Vec<JobEvent>>> {
    job_service::get_job(&s, id).await?;
    Ok(Json(s.store.list_job_events(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest { #[validate(length(min = 1, max = 2000))] pub text: String }

async fn add_note(State(s): State<AppState>, Path(id): Path<Uuid>, ValidJson(r): ValidJson<NoteRequest>) -> ApiResult<(StatusCode, Json<Job>)> {
    Ok((StatusCode::CREATED, Json(job_service::add_note(&s, id, &r.text).await?)))
}
