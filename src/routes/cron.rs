use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::auth::Cron;
use crate::services::batch_scheduler::{self, SchedulerReport};
use crate::{ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/cron/batches", get(run_batches).post(run_batches))
}

async fn run_batches(_: Cron, State(s): State<AppState>) -> ApiResult<Json<SchedulerReport>> {
    Ok(Json(batch_scheduler::run_due(&s, Utc::now()).await?))
}
