//! Job workflows: creation, status changes, notes and reorders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Job, JobItem, JobStatus};
use crate::domain::events::JobEvent;
use crate::domain::value_objects::Quantity;
use crate::events::publish_job_events;
use crate::store::StoreError;
use crate::{ApiError, ApiResult, AppState};

const NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize, Validate)]
pub struct NewJob {
    pub customer_id: Uuid,
    #[validate(length(min = 1))]
    pub collection_id: String,
    #[validate(length(min = 1, message = "a job needs at least one item"))]
    pub items: Vec<NewJobItem>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct NewJobItem {
    #[validate(length(min = 1))]
    pub variant_id: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

async fn save(state: &AppState, job: &mut Job) -> ApiResult<()> {
    let events: Vec<JobEvent> = job.pending_events.clone();
    state.store.save_job(job).await?;
    publish_job_events(state.nats.as_ref(), &events).await;
    Ok(())
}

/// Inserts the job, drawing a new number when the current one is taken.
async fn insert(state: &AppState, job: &mut Job) -> ApiResult<()> {
    let events: Vec<JobEvent> = job.pending_events.clone();
    let mut attempt = 1;
    loop {
        match state.store.insert_job(job).await {
            Err(StoreError::Conflict(_)) if attempt < NUMBER_ATTEMPTS => {
                tracing::debug!(number = %job.number, attempt, "job number taken, renumbering");
                job.renumber();
                attempt += 1;
            }
            result => break result?,
        }
    }
    publish_job_events(state.nats.as_ref(), &events).await;
    Ok(())
}

/// Prices are stored as `NUMERIC(12, 2)`.
fn check_price(price: Decimal) -> ApiResult<()> {
    let max = Decimal::new(9_999_999_999_99, 2);
    if price.is_sign_negative() { return Err(ApiError::BadRequest("unit_price must not be negative".into())); }
    if price.normalize().scale() > 2 { return Err(ApiError::BadRequest(format!("unit_price {price} has more than two decimal places"))); }
    if price > max { return Err(ApiError::BadRequest(format!("unit_price {price} exceeds {max}"))); }
    Ok(())
}

pub async fn create_job(state: &AppState, req: NewJob) -> ApiResult<Job> {
    req.validate()?;
    for item in &req.items {
        item.validate()?;
        check_price(item.unit_price)?;
    }
    state.store.get_customer(req.customer_id).await?.ok_or(ApiError::NotFound("customer"))?;
    let items = req.items.into_iter()
        .map(|i| -> ApiResult<JobItem> { Ok(JobItem::new(i.variant_id, i.title, Quantity::new(i.quantity)?, i.unit_price)) })
        .collect::<ApiResult<Vec<_>>>()?;
    let mut job = Job::create(req.customer_id, req.collection_id, items)?;
    insert(state, &mut job).await?;
    tracing::info!(job_id = %job.id, number = %job.number, customer_id = %job.customer_id, total = %job.total().amount(), "job created");
    Ok(job)
}

pub async fn get_job(state: &AppState, id: Uuid) -> ApiResult<Job> {
    state.store.get_job(id).await?.ok_or(ApiError::NotFound("job"))
}

/// Moves the job to `to`. Cancelling a batched job also takes its lines out
/// of the batch, which must still be open.
pub async fn change_status(state: &AppState, id: Uuid, to: JobStatus, note: Option<&str>) -> ApiResult<Job> {
    let mut job = get_job(state, id).await?;
    let from = job.status;
    match (to, job.batch_id) {
        (JobStatus::Cancelled, Some(batch_id)) if from.can_transition_to(to) => {
            let mut batch = state.store.get_batch(batch_id).await?.ok_or(ApiError::NotFound("batch"))?;
            batch.remove_job(&mut job)?;
            job.transition(to, note)?;
            let events: Vec<JobEvent> = job.pending_events.clone();
            state.store.save_batch(&mut batch, &[], std::slice::from_mut(&mut job)).await?;
            publish_job_events(state.nats.as_ref(), &events).await;
            tracing::info!(job_id = %id, %batch_id, "cancelled job removed from batch");
        }
        _ => {
            job.transition(to, note)?;
            save(state, &mut job).await?;
        }
    }
    tracing::info!(job_id = %id, %from, %to, "job status changed");
    Ok(job)
}

pub async fn add_note(state: &AppState, id: Uuid, text: &str) -> ApiResult<Job> {
    let mut job = get_job(state, id).await?;
    job.add_note(text)?;
    save(state, &mut job).await?;
    Ok(job)
}

#[derive(Debug, Deserialize)]
pub struct QuantityOverride { pub item_id: Uuid, pub quantity: i32 }

/// Reorders one of the customer's own jobs. Jobs of other customers are
/// reported as missing.
pub async fn request_reorder(state: &AppState, customer_id: Uuid, job_id: Uuid, overrides: &[QuantityOverride]) -> ApiResult<Job> {
    let mut original = get_job(state, job_id).await?;
    if original.customer_id != customer_id { return Err(ApiError::NotFound("job")); }
    let overrides = overrides.iter().map(|o| -> ApiResult<(Uuid, Quantity)> { Ok((o.item_id, Quantity::new(o.quantity)?)) }).collect::<ApiResult<Vec<_>>>()?;
    let mut reorder = original.reorder(&overrides)?;
    let mut events: Vec<JobEvent> = reorder.pending_events.clone();
    events.extend(original.pending_events.iter().cloned());
    let mut attempt = 1;
    loop {
        match state.store.insert_reorder(&mut reorder, &mut original).await {
            Err(StoreError::Conflict(_)) if attempt < NUMBER_ATTEMPTS => { reorder.renumber(); attempt += 1; }
            result => break result?,
        }
    }
    publish_job_events(state.nats.as_ref(), &events).await;
    tracing::info!(original = %job_id, reorder = %reorder.id, "reorder requested");
    Ok(reorder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::JobEventKind;
    use crate::services::test_support::{customer, state};

    fn new_job(customer_id: Uuid) -> NewJob {
        NewJob {
            customer_id, collection_id: "coll-1".into(),
            items: vec![NewJobItem { variant_id: "v1".into(), title: "Tee".into(), quantity: 2, unit_price: Decimal::new(1200, 2) }],
        }
    }

    #[tokio::test]
    async fn test_create_and_transition() {
        let state = state();
        let c = customer(&state, "Ada Lovelace").await;
        let job = create_job(&state, new_job(c.id)).await.unwrap();
        let job = change_status(&state, job.id, JobStatus::Approved, Some("ok")).await.unwrap();
        assert_eq!(job.status, JobStatus::Approved);
        let events = state.store.list_job_events(job.id).await.unwrap();
        assert_eq!(events.iter().map(|e| e.kind).collect::<Vec<_>>(), [JobEventKind::Created, JobEventKind::StatusChanged]);
        assert!(matches!(change_status(&state, job.id, JobStatus::Delivered, None).await, Err(ApiError::BadRequest(_))));
        assert_eq!(state.store.list_job_events(job.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let state = state();
        let c = customer(&state, "Ada").await;
        let mut req = new_job(c.id);
        req.items.clear();
        assert!(matches!(create_job(&state, req).await, Err(ApiError::BadRequest(_))));
        let mut req = new_job(c.id);
        req.items[0].quantity = 0;
        assert!(matches!(create_job(&state, req).await, Err(ApiError::BadRequest(_))));
        assert!(matches!(create_job(&state, new_job(Uuid::now_v7())).await, Err(ApiError::NotFound("customer"))));
    }

    #[tokio::test]
    async fn test_unit_price_must_fit_storage() {
        let state = state();
        let c = customer(&state, "Ada").await;
        for (price, ok) in [("9.999", false), ("-1", false), ("10000000000", false), ("9999999999.99", true), ("9.50", true), ("12.500", true)] {
            let mut req = new_job(c.id);
            req.items[0].unit_price = price.parse().unwrap();
            let result = create_job(&state, req).await;
            assert_eq!(result.is_ok(), ok, "{price}: {result:?}");
        }
    }

    #[tokio::test]
    async fn test_taken_number_is_redrawn() {
        let state = state();
        let c = customer(&state, "Ada").await;
        let first = create_job(&state, new_job(c.id)).await.unwrap();
        let items = vec![JobItem::new("v1", "Tee", Quantity::new(1).unwrap(), Decimal::ONE)];
        let mut second = Job::create(c.id, "coll-1", items).unwrap();
        second.number = first.number.clone();
        insert(&state, &mut second).await.unwrap();
        assert_ne!(second.number, first.number);
        assert_eq!(state.store.get_job(second.id).await.unwrap().unwrap().number, second.number);
    }

    #[tokio::test]
    async fn test_reorder_ownership() {
        let state = state();
        let owner = customer(&state, "Ada").await;
        let other = customer(&state, "Grace").await;
        let job = create_job(&state, new_job(owner.id)).await.unwrap();
        for s in [JobStatus::Approved, JobStatus::InProduction, JobStatus::Shipped] { change_status(&state, job.id, s, None).await.unwrap(); }
        assert!(matches!(request_reorder(&state, other.id, job.id, &[]).await, Err(ApiError::NotFound("job"))));
        let item = job.items[0].id;
        let again = request_reorder(&state, owner.id, job.id, &[QuantityOverride { item_id: item, quantity: 7 }]).await.unwrap();
        assert_eq!(again.reorder_of, Some(job.id));
        assert_eq!(again.items[0].quantity.value(), 7);
        let events = state.store.list_job_events(job.id).await.unwrap();
        assert_eq!(events.last().unwrap().kind, JobEventKind::ReorderRequested);
        assert_eq!(events.last().unwrap().payload["new_job_id"], again.id.to_string());
        assert_eq!(state.store.list_job_events(again.id).await.unwrap()[0].kind, JobEventKind::Created);
    }

    #[tokio::test]
    async fn test_reorder_from_stale_original_is_not_stored() {
        let state = state();
        let owner = customer(&state, "Ada").await;
        let job = create_job(&state, new_job(owner.id)).await.unwrap();
        for s in [JobStatus::Approved, JobStatus::InProduction, JobStatus::Shipped] { change_status(&state, job.id, s, None).await.unwrap(); }
        let mut stale = state.store.get_job(job.id).await.unwrap().unwrap();
        change_status(&state, job.id, JobStatus::Delivered, None).await.unwrap();
        let mut reorder = stale.reorder(&[]).unwrap();
        assert!(matches!(state.store.insert_reorder(&mut reorder, &mut stale).await, Err(StoreError::Stale(_))));
        assert!(state.store.get_job(reorder.id).await.unwrap().is_none());
    }
}
