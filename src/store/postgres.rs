use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{BatchFilter, JobFilter, Store, StoreError, StoreResult};
use crate::domain::aggregates::{Batch, BatchLine, BatchStatus, Customer, DropShop, Job, JobItem, JobStatus, Session, ThemeMode};
use crate::domain::events::{JobEvent, JobEventKind};
use crate::domain::value_objects::{HexColor, Quantity, Slug};

#[derive(Clone)]
pub struct PgStore { db: PgPool }

impl PgStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[derive(sqlx::FromRow)]
struct JobRow { id: Uuid, number: String, customer_id: Uuid, collection_id: String, status: String, batch_id: Option<Uuid>, reorder_of: Option<Uuid>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>, version: i32 }

#[derive(sqlx::FromRow)]
struct JobItemRow { id: Uuid, job_id: Uuid, variant_id: String, title: String, quantity: i32, unit_price: Decimal }

#[derive(sqlx::FromRow)]
struct JobEventRow { id: Uuid, job_id: Uuid, kind: String, payload: serde_json::Value, created_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct BatchRow { id: Uuid, collection_id: String, period_start: DateTime<Utc>, period_end: DateTime<Utc>, status: String, purchase_order_number: Option<String>, created_at: DateTime<Utc>, closed_at: Option<DateTime<Utc>>, version: i32 }

#[derive(sqlx::FromRow)]
struct BatchLineRow { id: Uuid, batch_id: Uuid, job_id: Uuid, job_item_id: Uuid, variant_id: String, title: String, quantity: i32, unit_price: Decimal }

#[derive(sqlx::FromRow)]
struct DropShopRow { id: Uuid, slug: String, title: String, collection_id: String, collection_handle: String, theme_color: String, theme_mode: String, batch_cadence_days: Option<i32>, next_batch_due: Option<DateTime<Utc>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError { StoreError::Corrupt(format!("{what}: {value}")) }

impl JobRow {
    fn into_job(self, items: Vec<JobItem>) -> StoreResult<Job> {
        Ok(Job {
            status: JobStatus::parse(&self.status).ok_or_else(|| corrupt("job status", &self.status))?,
            id: self.id, number: self.number, customer_id: self.customer_id, collection_id: self.collection_id, items,
            batch_id: self.batch_id, reorder_of: self.reorder_of, created_at: self.created_at, updated_at: self.updated_at,
            version: self.version, pending_events: vec![],
        })
    }
}

impl TryFrom<JobItemRow> for JobItem {
    type Error = StoreError;
    fn try_from(r: JobItemRow) -> StoreResult<Self> {
        Ok(JobItem { id: r.id, variant_id: r.variant_id, title: r.title, quantity: Quantity::new(r.quantity).map_err(|e| corrupt("job item", e))?, unit_price: r.unit_price })
    }
}

impl TryFrom<JobEventRow> for JobEvent {
    type Error = StoreError;
    fn try_from(r: JobEventRow) -> StoreResult<Self> {
        Ok(JobEvent { kind: JobEventKind::parse(&r.kind).ok_or_else(|| corrupt("job event kind", &r.kind))?, id: r.id, job_id: r.job_id, payload: r.payload, created_at: r.created_at })
    }
}

impl From<BatchLineRow> for BatchLine {
    fn from(r: BatchLineRow) -> Self {
        BatchLine { id: r.id, batch_id: r.batch_id, job_id: r.job_id, job_item_id: r.job_item_id, variant_id: r.variant_id, title: r.title, quantity: r.quantity, unit_price: r.unit_price }
    }
}

impl BatchRow {
    fn into_batch(self, lines: Vec<BatchLine>) -> StoreResult<Batch> {
        Ok(Batch {
            status: BatchStatus::parse(&self.status).ok_or_else(|| corrupt("batch status", &self.status))?,
            id: self.id, collection_id: self.collection_id, period_start: self.period_start, period_end: self.period_end,
            purchase_order_number: self.purchase_order_number, lines, created_at: self.created_at, closed_at: self.closed_at,
            version: self.version,
        })
    }
}

impl TryFrom<DropShopRow> for DropShop {
    type Error = StoreError;
    fn try_from(r: DropShopRow) -> StoreResult<Self> {
        Ok(DropShop {
            slug: Slug::new(&r.slug).map_err(|e| corrupt("drop shop slug", e))?,
            theme_color: HexColor::new(&r.theme_color).map_err(|e| corrupt("drop shop color", e))?,
            theme_mode: ThemeMode::parse(&r.theme_mode).ok_or_else(|| corrupt("drop shop mode", &r.theme_mode))?,
            id: r.id, title: r.title, collection_id: r.collection_id, collection_handle: r.collection_handle,
            batch_cadence_days: r.batch_cadence_days, next_batch_due: r.next_batch_due, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

fn unique_violation(e: sqlx::Error, msg: String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(msg),
        _ => StoreError::Database(e),
    }
}

async fn append_events(tx: &mut Transaction<'_, Postgres>, job: &mut Job) -> StoreResult<()> {
    for e in job.take_events() {
        sqlx::query("INSERT INTO job_events (id, job_id, kind, payload, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(e.id).bind(e.job_id).bind(e.kind.as_str()).bind(&e.payload).bind(e.created_at)
            .execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_job_rows(tx: &mut Transaction<'_, Postgres>, job: &mut Job) -> StoreResult<()> {
    sqlx::query("INSERT INTO jobs (id, number, customer_id, collection_id, status, batch_id, reorder_of, created_at, updated_at, version) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
        .bind(job.id).bind(&job.number).bind(job.customer_id).bind(&job.collection_id).bind(job.status.as_str())
        .bind(job.batch_id).bind(job.reorder_of).bind(job.created_at).bind(job.updated_at).bind(job.version)
        .execute(&mut **tx).await.map_err(|e| unique_violation(e, format!("job {} already exists", job.number)))?;
    for (position, i) in job.items.iter().enumerate() {
        sqlx::query("INSERT INTO job_items (id, job_id, position, variant_id, title, quantity, unit_price) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(i.id).bind(job.id).bind(position as i32).bind(&i.variant_id).bind(&i.title).bind(i32::from(i.quantity)).bind(i.unit_price)
            .execute(&mut **tx).await?;
    }
    append_events(tx, job).await
}

/// Writes the job only if its row still has the version it was loaded at.
async fn update_job(tx: &mut Transaction<'_, Postgres>, job: &mut Job) -> StoreResult<()> {
    let updated = sqlx::query("UPDATE jobs SET status = $2, batch_id = $3, updated_at = $4, version = version + 1 WHERE id = $1 AND version = $5")
        .bind(job.id).bind(job.status.as_str()).bind(job.batch_id).bind(job.updated_at).bind(job.version)
        .execute(&mut **tx).await?;
    if updated.rows_affected() == 0 { return Err(StoreError::Stale(format!("job {}", job.number))); }
    job.version += 1;
    append_events(tx, job).await
}

impl PgStore {
    async fn load_items(&self, job_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<JobItem>>> {
        let rows = sqlx::query_as::<_, JobItemRow>("SELECT id, job_id, variant_id, title, quantity, unit_price FROM job_items WHERE job_id = ANY($1) ORDER BY position")
            .bind(job_ids).fetch_all(&self.db).await?;
        let mut by_job: HashMap<Uuid, Vec<JobItem>> = HashMap::new();
        for r in rows { by_job.entry(r.job_id).or_default().push(r.try_into()?); }
        Ok(by_job)
    }

    async fn load_lines(&self, batch_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<BatchLine>>> {
        let rows = sqlx::query_as::<_, BatchLineRow>("SELECT * FROM batch_lines WHERE batch_id = ANY($1) ORDER BY id")
            .bind(batch_ids).fetch_all(&self.db).await?;
        let mut by_batch: HashMap<Uuid, Vec<BatchLine>> = HashMap::new();
        for r in rows { by_batch.entry(r.batch_id).or_default().push(r.into()); }
        Ok(by_batch)
    }

    async fn hydrate_jobs(&self, rows: Vec<JobRow>) -> StoreResult<Vec<Job>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;
        rows.into_iter().map(|r| { let i = items.remove(&r.id).unwrap_or_default(); r.into_job(i) }).collect()
    }

    async fn hydrate_batches(&self, rows: Vec<BatchRow>) -> StoreResult<Vec<Batch>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.load_lines(&ids).await?;
        rows.into_iter().map(|r| { let l = lines.remove(&r.id).unwrap_or_default(); r.into_batch(l) }).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_customer(&self, c: &Customer) -> StoreResult<()> {
        sqlx::query("INSERT INTO customers (id, first_name, last_name, email, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(c.id).bind(&c.first_name).bind(&c.last_name).bind(&c.email).bind(c.created_at)
            .execute(&self.db).await.map_err(|e| unique_violation(e, format!("customer {} already exists", c.email)))?;
        Ok(())
    }

    async fn get_customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>)>("SELECT id, first_name, last_name, email, created_at FROM customers WHERE id = $1")
            .bind(id).fetch_optional(&self.db).await?;
        Ok(row.map(|(id, first_name, last_name, email, created_at)| Customer { id, first_name, last_name, email, created_at }))
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>)>("SELECT id, first_name, last_name, email, created_at FROM customers ORDER BY created_at DESC")
            .fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(|(id, first_name, last_name, email, created_at)| Customer { id, first_name, last_name, email, created_at }).collect())
    }

    async fn insert_session(&self, s: &Session) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token, customer_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&s.token).bind(s.customer_id).bind(s.expires_at).execute(&self.db).await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, (String, Uuid, DateTime<Utc>)>("SELECT token, customer_id, expires_at FROM sessions WHERE token = $1")
            .bind(token).fetch_optional(&self.db).await?;
        Ok(row.map(|(token, customer_id, expires_at)| Session { token, customer_id, expires_at }))
    }

    async fn insert_job(&self, job: &mut Job) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        insert_job_rows(&mut tx, job).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_reorder(&self, reorder: &mut Job, original: &mut Job) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        insert_job_rows(&mut tx, reorder).await?;
        update_job(&mut tx, original).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_job(&self, job: &mut Job) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        update_job(&mut tx, job).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let Some(row) = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1").bind(id).fetch_optional(&self.db).await? else { return Ok(None) };
        Ok(self.hydrate_jobs(vec![row]).await?.pop())
    }

    async fn list_jobs(&self, f: &JobFilter) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE ($1::uuid IS NULL OR customer_id = $1) AND ($2::text IS NULL OR status = $2) \
             AND ($3::text IS NULL OR collection_id = $3) AND ($4::uuid IS NULL OR batch_id = $4) ORDER BY created_at DESC, id DESC")
            .bind(f.customer_id).bind(f.status.map(|s| s.as_str())).bind(f.collection_id.as_deref()).bind(f.batch_id)
            .fetch_all(&self.db).await?;
        self.hydrate_jobs(rows).await
    }

    async fn list_job_events(&self, job_id: Uuid) -> StoreResult<Vec<JobEvent>> {
        sqlx::query_as::<_, JobEventRow>("SELECT * FROM job_events WHERE job_id = $1 ORDER BY created_at, id")
            .bind(job_id).fetch_all(&self.db).await?
            .into_iter().map(JobEvent::try_from).collect()
    }

    async fn insert_batch(&self, b: &Batch) -> StoreResult<()> {
        sqlx::query("INSERT INTO batches (id, collection_id, period_start, period_end, status, purchase_order_number, created_at, closed_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(b.id).bind(&b.collection_id).bind(b.period_start).bind(b.period_end).bind(b.status.as_str())
            .bind(&b.purchase_order_number).bind(b.created_at).bind(b.closed_at)
            .execute(&self.db).await.map_err(|e| unique_violation(e, format!("collection {} already has an open batch", b.collection_id)))?;
        Ok(())
    }

    async fn save_batch(&self, b: &mut Batch, new_lines: &[BatchLine], jobs: &mut [Job]) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        let updated = sqlx::query("UPDATE batches SET status = $2, purchase_order_number = $3, closed_at = $4, version = version + 1 WHERE id = $1 AND version = $5")
            .bind(b.id).bind(b.status.as_str()).bind(&b.purchase_order_number).bind(b.closed_at).bind(b.version)
            .execute(&mut *tx).await
            .map_err(|e| unique_violation(e, format!("collection {} already has an open batch", b.collection_id)))?;
        if updated.rows_affected() == 0 { return Err(StoreError::Stale(format!("batch {}", b.id))); }
        let kept: Vec<Uuid> = b.lines.iter().map(|l| l.id).collect();
        sqlx::query("DELETE FROM batch_lines WHERE batch_id = $1 AND NOT (id = ANY($2))")
            .bind(b.id).bind(&kept).execute(&mut *tx).await?;
        for l in new_lines {
            sqlx::query("INSERT INTO batch_lines (id, batch_id, job_id, job_item_id, variant_id, title, quantity, unit_price) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
                .bind(l.id).bind(l.batch_id).bind(l.job_id).bind(l.job_item_id).bind(&l.variant_id).bind(&l.title).bind(l.quantity).bind(l.unit_price)
                .execute(&mut *tx).await?;
        }
        for job in jobs.iter_mut() { update_job(&mut tx, job).await?; }
        tx.commit().await?;
        b.version += 1;
        Ok(())
    }

    async fn get_batch(&self, id: Uuid) -> StoreResult<Option<Batch>> {
        let Some(row) = sqlx::query_as::<_, BatchRow>("SELECT * FROM batches WHERE id = $1").bind(id).fetch_optional(&self.db).await? else { return Ok(None) };
        Ok(self.hydrate_batches(vec![row]).await?.pop())
    }

    async fn find_open_batch(&self, collection_id: &str) -> StoreResult<Option<Batch>> {
        let Some(row) = sqlx::query_as::<_, BatchRow>("SELECT * FROM batches WHERE collection_id = $1 AND status = 'open'")
            .bind(collection_id).fetch_optional(&self.db).await? else { return Ok(None) };
        Ok(self.hydrate_batches(vec![row]).await?.pop())
    }

    async fn list_batches(&self, f: &BatchFilter) -> StoreResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            "SELECT * FROM batches WHERE ($1::text IS NULL OR collection_id = $1) AND ($2::text IS NULL OR status = $2) ORDER BY period_start DESC, id DESC")
            .bind(f.collection_id.as_deref()).bind(f.status.map(|s| s.as_str()))
            .fetch_all(&self.db).await?;
        self.hydrate_batches(rows).await
    }

    async fn insert_drop_shop(&self, s: &DropShop) -> StoreResult<()> {
        sqlx::query("INSERT INTO drop_shops (id, slug, title, collection_id, collection_handle, theme_color, theme_mode, batch_cadence_days, next_batch_due, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
            .bind(s.id).bind(s.slug.as_str()).bind(&s.title).bind(&s.collection_id).bind(&s.collection_handle)
            .bind(s.theme_color.as_str()).bind(s.theme_mode.as_str()).bind(s.batch_cadence_days).bind(s.next_batch_due)
            .bind(s.created_at).bind(s.updated_at)
            .execute(&self.db).await.map_err(|e| unique_violation(e, format!("drop shop {} already exists", s.slug)))?;
        Ok(())
    }

    async fn update_drop_shop(&self, s: &DropShop) -> StoreResult<()> {
        sqlx::query("UPDATE drop_shops SET title = $2, collection_id = $3, collection_handle = $4, theme_color = $5, theme_mode = $6, batch_cadence_days = $7, next_batch_due = $8, updated_at = $9 WHERE id = $1")
            .bind(s.id).bind(&s.title).bind(&s.collection_id).bind(&s.collection_handle).bind(s.theme_color.as_str())
            .bind(s.theme_mode.as_str()).bind(s.batch_cadence_days).bind(s.next_batch_due).bind(s.updated_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get_drop_shop(&self, slug: &str) -> StoreResult<Option<DropShop>> {
        sqlx::query_as::<_, DropShopRow>("SELECT * FROM drop_shops WHERE slug = $1").bind(slug).fetch_optional(&self.db).await?
            .map(DropShop::try_from).transpose()
    }

    async fn list_drop_shops(&self) -> StoreResult<Vec<DropShop>> {
        sqlx::query_as::<_, DropShopRow>("SELECT * FROM drop_shops ORDER BY slug").fetch_all(&self.db).await?
            .into_iter().map(DropShop::try_from).collect()
    }
}
