//! Batch lifecycle: open, fill with approved jobs, close, order, receive.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::{Batch, JobStatus, PurchaseOrder};
use crate::domain::events::JobEvent;
use crate::events::publish_job_events;
use crate::{ApiError, ApiResult, AppState};

pub async fn get_batch(state: &AppState, id: Uuid) -> ApiResult<Batch> {
    state.store.get_batch(id).await?.ok_or(ApiError::NotFound("batch"))
}

pub async fn open_batch(state: &AppState, collection_id: &str, period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> ApiResult<Batch> {
    let batch = Batch::open(collection_id, period_start, period_end)?;
    state.store.insert_batch(&batch).await?;
    tracing::info!(batch_id = %batch.id, collection_id, %period_start, %period_end, "batch opened");
    Ok(batch)
}

pub async fn add_job(state: &AppState, batch_id: Uuid, job_id: Uuid) -> ApiResult<Batch> {
    let mut batch = get_batch(state, batch_id).await?;
    let mut job = state.store.get_job(job_id).await?.ok_or(ApiError::NotFound("job"))?;
    let lines = batch.add_job(&mut job)?;
    let events = job.pending_events.clone();
    state.store.save_batch(&mut batch, &lines, std::slice::from_mut(&mut job)).await?;
    publish_job_events(state.nats.as_ref(), &events).await;
    tracing::info!(%batch_id, %job_id, lines = lines.len(), "job added to batch");
    Ok(batch)
}

pub async fn close(state: &AppState, batch_id: Uuid) -> ApiResult<Batch> {
    let mut batch = get_batch(state, batch_id).await?;
    batch.close()?;
    state.store.save_batch(&mut batch, &[], &mut []).await?;
    tracing::info!(%batch_id, lines = batch.lines.len(), "batch closed");
    Ok(batch)
}

pub async fn cancel(state: &AppState, batch_id: Uuid) -> ApiResult<Batch> {
    let mut batch = get_batch(state, batch_id).await?;
    batch.cancel()?;
    state.store.save_batch(&mut batch, &[], &mut []).await?;
    tracing::info!(%batch_id, "batch cancelled");
    Ok(batch)
}

/// Records the supplier purchase order and moves the batch's approved jobs
/// into production.
pub async fn mark_ordered(state: &AppState, batch_id: Uuid, purchase_order_number: &str) -> ApiResult<Batch> {
    let mut batch = get_batch(state, batch_id).await?;
    batch.mark_ordered(purchase_order_number)?;
    let mut jobs = Vec::new();
    for job_id in batch.job_ids() {
        let Some(mut job) = state.store.get_job(job_id).await? else { continue };
        if job.status != JobStatus::Approved {
            tracing::warn!(%batch_id, %job_id, status = %job.status, "batched job not approved, leaving as is");
            continue;
        }
        let note = format!("purchase order {}", batch.purchase_order_number.as_deref().unwrap_or_default());
        job.transition(JobStatus::InProduction, Some(&note))?;
        jobs.push(job);
    }
    let events: Vec<JobEvent> = jobs.iter().flat_map(|j| j.pending_events.iter().cloned()).collect();
    state.store.save_batch(&mut batch, &[], &mut jobs).await?;
    publish_job_events(state.nats.as_ref(), &events).await;
    tracing::info!(%batch_id, po = purchase_order_number, jobs = jobs.len(), "batch ordered");
    Ok(batch)
}

pub async fn mark_received(state: &AppState, batch_id: Uuid) -> ApiResult<Batch> {
    let mut batch = get_batch(state, batch_id).await?;
    batch.mark_received()?;
    state.store.save_batch(&mut batch, &[], &mut []).await?;
    tracing::info!(%batch_id, "batch received");
    Ok(batch)
}

pub async fn purchase_order(state: &AppState, batch_id: Uuid) -> ApiResult<PurchaseOrder> {
    Ok(get_batch(state, batch_id).await?.purchase_order())
}
