//! Persistence boundary. Handlers and services only see [`Store`]; Postgres
//! backs it in production and [`MemoryStore`] in tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Batch, BatchLine, BatchStatus, Customer, DropShop, Job, JobStatus, Session};
use crate::domain::events::JobEvent;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Conflict(String),

    /// The row changed since it was loaded.
    #[error("{0} was modified concurrently, retry")]
    Stale(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Default, Clone)]
pub struct JobFilter { pub customer_id: Option<Uuid>, pub status: Option<JobStatus>, pub collection_id: Option<String>, pub batch_id: Option<Uuid> }

#[derive(Debug, Default, Clone)]
pub struct BatchFilter { pub collection_id: Option<String>, pub status: Option<BatchStatus> }

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;
    async fn get_customer(&self, id: Uuid) -> StoreResult<Option<Customer>>;
    async fn list_customers(&self) -> StoreResult<Vec<Customer>>;
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;

    /// Inserts the job with its items and appends its pending events. Fails
    /// with `Conflict` when the job number is taken.
    async fn insert_job(&self, job: &mut Job) -> StoreResult<()>;
    /// Persists status and batch link and appends pending events. Fails with
    /// `Stale` when the job changed since it was loaded.
    async fn save_job(&self, job: &mut Job) -> StoreResult<()>;
    /// Inserts `reorder` and saves `original` in one transaction.
    async fn insert_reorder(&self, reorder: &mut Job, original: &mut Job) -> StoreResult<()>;
    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>>;
    async fn list_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>>;
    /// Oldest first.
    async fn list_job_events(&self, job_id: Uuid) -> StoreResult<Vec<JobEvent>>;

    /// Fails with `Conflict` when the collection already has an open batch.
    async fn insert_batch(&self, batch: &Batch) -> StoreResult<()>;
    /// Persists batch status, appends `new_lines`, drops lines no longer in
    /// `batch.lines` and saves `jobs`, atomically. Fails with `Stale` when the
    /// batch or any job changed since it was loaded.
    async fn save_batch(&self, batch: &mut Batch, new_lines: &[BatchLine], jobs: &mut [Job]) -> StoreResult<()>;
    async fn get_batch(&self, id: Uuid) -> StoreResult<Option<Batch>>;
    async fn find_open_batch(&self, collection_id: &str) -> StoreResult<Option<Batch>>;
    async fn list_batches(&self, filter: &BatchFilter) -> StoreResult<Vec<Batch>>;

    /// Fails with `Conflict` when the slug is taken.
    async fn insert_drop_shop(&self, shop: &DropShop) -> StoreResult<()>;
    async fn update_drop_shop(&self, shop: &DropShop) -> StoreResult<()>;
    async fn get_drop_shop(&self, slug: &str) -> StoreResult<Option<DropShop>>;
    async fn list_drop_shops(&self) -> StoreResult<Vec<DropShop>>;
}
