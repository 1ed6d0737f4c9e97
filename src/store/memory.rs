use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BatchFilter, JobFilter, Store, StoreError, StoreResult};
use crate::domain::aggregates::{Batch, BatchLine, BatchStatus, Customer, DropShop, Job, Session};
use crate::domain::events::JobEvent;

#[derive(Default)]
struct Tables {
    customers: HashMap<Uuid, Customer>,
    sessions: HashMap<String, Session>,
    jobs: HashMap<Uuid, Job>,
    job_events: Vec<JobEvent>,
    batches: HashMap<Uuid, Batch>,
    drop_shops: HashMap<Uuid, DropShop>,
}

/// In-process store with the same constraints as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore { tables: RwLock<Tables> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn check_new_job(t: &Tables, job: &Job) -> StoreResult<()> {
    if t.jobs.contains_key(&job.id) { return Err(StoreError::Conflict(format!("job {} already exists", job.id))); }
    if t.jobs.values().any(|j| j.number == job.number) { return Err(StoreError::Conflict(format!("job {} already exists", job.number))); }
    Ok(())
}

fn check_job_version(t: &Tables, job: &Job) -> StoreResult<()> {
    match t.jobs.get(&job.id) {
        Some(stored) if stored.version == job.version => Ok(()),
        Some(_) => Err(StoreError::Stale(format!("job {}", job.number))),
        None => Err(StoreError::Corrupt(format!("job {} not stored", job.id))),
    }
}

fn write_job(t: &mut Tables, job: &mut Job) {
    t.job_events.extend(job.take_events());
    t.jobs.insert(job.id, job.clone());
}

fn bump_job(t: &mut Tables, job: &mut Job) {
    job.version += 1;
    write_job(t, job);
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::Conflict(format!("customer {} already exists", customer.email)));
        }
        t.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let mut all: Vec<Customer> = self.tables.read().await.customers.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        self.tables.write().await.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn insert_job(&self, job: &mut Job) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        check_new_job(&t, job)?;
        write_job(&mut t, job);
        Ok(())
    }

    async fn save_job(&self, job: &mut Job) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        check_job_version(&t, job)?;
        bump_job(&mut t, job);
        Ok(())
    }

    async fn insert_reorder(&self, reorder: &mut Job, original: &mut Job) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        check_new_job(&t, reorder)?;
        check_job_version(&t, original)?;
        write_job(&mut t, reorder);
        bump_job(&mut t, original);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        let t = self.tables.read().await;
        let mut jobs: Vec<Job> = t.jobs.values()
            .filter(|j| filter.customer_id.map_or(true, |c| j.customer_id == c))
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .filter(|j| filter.collection_id.as_ref().map_or(true, |c| &j.collection_id == c))
            .filter(|j| filter.batch_id.map_or(true, |b| j.batch_id == Some(b)))
            .cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn list_job_events(&self, job_id: Uuid) -> StoreResult<Vec<JobEvent>> {
        Ok(self.tables.read().await.job_events.iter().filter(|e| e.job_id == job_id).cloned().collect())
    }

    async fn insert_batch(&self, batch: &Batch) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if batch.status == BatchStatus::Open && t.batches.values().any(|b| b.is_open() && b.collection_id == batch.collection_id) {
            return Err(StoreError::Conflict(format!("collection {} already has an open batch", batch.collection_id)));
        }
        t.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn save_batch(&self, batch: &mut Batch, new_lines: &[BatchLine], jobs: &mut [Job]) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let stored = t.batches.get(&batch.id).ok_or_else(|| StoreError::Corrupt(format!("batch {} not stored", batch.id)))?;
        if stored.version != batch.version { return Err(StoreError::Stale(format!("batch {}", batch.id))); }
        for job in jobs.iter() { check_job_version(&t, job)?; }
        let mut lines: Vec<BatchLine> = stored.lines.iter().filter(|l| batch.lines.iter().any(|b| b.id == l.id)).cloned().collect();
        lines.extend(new_lines.iter().cloned());
        batch.version += 1;
        t.batches.insert(batch.id, Batch { lines, ..batch.clone() });
        for job in jobs.iter_mut() { bump_job(&mut t, job); }
        Ok(())
    }

    async fn get_batch(&self, id: Uuid) -> StoreResult<Option<Batch>> {
        Ok(self.tables.read().await.batches.get(&id).cloned())
    }

    async fn find_open_batch(&self, collection_id: &str) -> StoreResult<Option<Batch>> {
        Ok(self.tables.read().await.batches.values().find(|b| b.is_open() && b.collection_id == collection_id).cloned())
    }

    async fn list_batches(&self, filter: &BatchFilter) -> StoreResult<Vec<Batch>> {
        let t = self.tables.read().await;
        let mut batches: Vec<Batch> = t.batches.values()
            .filter(|b| filter.collection_id.as_ref().map_or(true, |c| &b.collection_id == c))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned().collect();
        batches.sort_by(|a, b| b.period_start.cmp(&a.period_start).then(b.id.cmp(&a.id)));
        Ok(batches)
    }

    async fn insert_drop_shop(&self, shop: &DropShop) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.drop_shops.values().any(|s| s.slug == shop.slug) {
            return Err(StoreError::Conflict(format!("drop shop {} already exists", shop.slug)));
        }
        t.drop_shops.insert(shop.id, shop.clone());
        Ok(())
    }

    async fn update_drop_shop(&self, shop: &DropShop) -> StoreResult<()> {
        self.tables.write().await.drop_shops.insert(shop.id, shop.clone());
        Ok(())
    }

    async fn get_drop_shop(&self, slug: &str) -> StoreResult<Option<DropShop>> {
        Ok(self.tables.read().await.drop_shops.values().find(|s| s.slug.as_str() == slug).cloned())
    }

    async fn list_drop_shops(&self) -> StoreResult<Vec<DropShop>> {
        let mut shops: Vec<DropShop> = self.tables.read().await.drop_shops.values().cloned().collect();
        shops.sort_by(|a, b| a.slug.as_str().cmp(b.slug.as_str()));
        Ok(shops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use crate::domain::aggregates::{JobItem, JobStatus};
    use crate::domain::value_objects::Quantity;

    fn job() -> Job {
        Job::create(Uuid::now_v7(), "coll-1", vec![JobItem::new("v1", "Tee", Quantity::new(3).unwrap(), Decimal::new(800, 2))]).unwrap()
    }

    #[tokio::test]
    async fn test_stale_batch_save_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let batch = Batch::open("coll-1", now, now + Duration::days(7)).unwrap();
        store.insert_batch(&batch).await.unwrap();
        let mut job = job();
        job.transition(JobStatus::Approved, None).unwrap();
        store.insert_job(&mut job).await.unwrap();

        let mut stale = store.get_batch(batch.id).await.unwrap().unwrap();
        let mut current = store.get_batch(batch.id).await.unwrap().unwrap();
        current.close().unwrap();
        store.save_batch(&mut current, &[], &mut []).await.unwrap();

        let lines = stale.add_job(&mut job).unwrap();
        let err = store.save_batch(&mut stale, &lines, std::slice::from_mut(&mut job)).await.unwrap_err();
        assert!(matches!(err, StoreError::Stale(_)));
        let stored = store.get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Closed);
        assert!(stored.lines.is_empty());
        assert_eq!(store.get_job(job.id).await.unwrap().unwrap().batch_id, None);
    }

    #[tokio::test]
    async fn test_stale_job_save_is_rejected() {
        let store = MemoryStore::new();
        let mut job = job();
        store.insert_job(&mut job).await.unwrap();
        let mut first = store.get_job(job.id).await.unwrap().unwrap();
        let mut second = store.get_job(job.id).await.unwrap().unwrap();
        first.transition(JobStatus::Approved, None).unwrap();
        store.save_job(&mut first).await.unwrap();
        second.transition(JobStatus::Cancelled, None).unwrap();
        assert!(matches!(store.save_job(&mut second).await, Err(StoreError::Stale(_))));
        assert_eq!(store.get_job(job.id).await.unwrap().unwrap().status, JobStatus::Approved);
        assert_eq!(store.list_job_events(job.id).await.unwrap().len(), 2);
        first.add_note("saved again").unwrap();
        store.save_job(&mut first).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_job_number_conflicts() {
        let store = MemoryStore::new();
        let mut a = job();
        store.insert_job(&mut a).await.unwrap();
        let mut b = job();
        b.number = a.number.clone();
        assert!(matches!(store.insert_job(&mut b).await, Err(StoreError::Conflict(_))));
        assert_eq!(b.pending_events.len(), 1);
    }
}
