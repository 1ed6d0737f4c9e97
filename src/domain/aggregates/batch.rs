//! Batch Aggregate
//!
//! A batch collects the line items of approved jobs for one collection over a
//! period and is then sent to the supplier as a single purchase order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::domain::aggregates::job::{Job, JobError};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub collection_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub status: BatchStatus,
    pub purchase_order_number: Option<String>,
    pub lines: Vec<BatchLine>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub version: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchLine { pub id: Uuid, pub batch_id: Uuid, pub job_id: Uuid, pub job_item_id: Uuid, pub variant_id: String, pub title: String, pub quantity: i32, pub unit_price: Decimal }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus { #[default] Open, Closed, Ordered, Received, Cancelled }

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Open => "open", Self::Closed => "closed", Self::Ordered => "ordered", Self::Received => "received", Self::Cancelled => "cancelled" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s { "open" => Self::Open, "closed" => Self::Closed, "ordered" => Self::Ordered, "received" => Self::Received, "cancelled" => Self::Cancelled, _ => return None })
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// One row of the purchase order: every batch line for a variant summed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PurchaseOrderLine { pub variant_id: String, pub title: String, pub quantity: i64, pub total_cost: Decimal }

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PurchaseOrder {
    pub batch_id: Uuid,
    pub collection_id: String,
    pub purchase_order_number: Option<String>,
    pub lines: Vec<PurchaseOrderLine>,
    pub total_quantity: i64,
    pub total_cost: Decimal,
}

impl Batch {
    pub fn open(collection_id: impl Into<String>, period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Result<Self, BatchError> {
        let collection_id = collection_id.into();
        if collection_id.trim().is_empty() { return Err(BatchError::MissingCollection); }
        if period_end <= period_start { return Err(BatchError::InvalidPeriod); }
        Ok(Self {
            id: Uuid::now_v7(), collection_id, period_start, period_end, status: BatchStatus::Open,
            purchase_order_number: None, lines: vec![], created_at: Utc::now(), closed_at: None, version: 0,
        })
    }

    pub fn is_open(&self) -> bool { self.status == BatchStatus::Open }

    /// Adds every item of `job` as a line and links the job to this batch.
    /// Returns the new lines.
    pub fn add_job(&mut self, job: &mut Job) -> Result<Vec<BatchLine>, BatchError> {
        if !self.is_open() { return Err(BatchError::NotOpen(self.status)); }
        if job.collection_id != self.collection_id { return Err(BatchError::CollectionMismatch); }
        job.assign_batch(self.id)?;
        let lines: Vec<BatchLine> = job.items.iter().map(|i| BatchLine {
            id: Uuid::now_v7(), batch_id: self.id, job_id: job.id, job_item_id: i.id,
            variant_id: i.variant_id.clone(), title: i.title.clone(), quantity: i.quantity.into(), unit_price: i.unit_price,
        }).collect();
        self.lines.extend(lines.iter().cloned());
        Ok(lines)
    }

    /// Drops the job's lines and unlinks it. Only while the batch is open.
    pub fn remove_job(&mut self, job: &mut Job) -> Result<(), BatchError> {
        if !self.is_open() { return Err(BatchError::NotOpen(self.status)); }
        job.release_batch(self.id)?;
        self.lines.retain(|l| l.job_id != job.id);
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), BatchError> {
        self.expect(BatchStatus::Open)?;
        self.status = BatchStatus::Closed;
        self.closed_at = Some(Utc::now());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), BatchError> {
        self.expect(BatchStatus::Open)?;
        if !self.lines.is_empty() { return Err(BatchError::NotEmpty); }
        self.status = BatchStatus::Cancelled;
        self.closed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_ordered(&mut self, purchase_order_number: &str) -> Result<(), BatchError> {
        self.expect(BatchStatus::Closed)?;
        let po = purchase_order_number.trim();
        if po.is_empty() { return Err(BatchError::MissingPurchaseOrder); }
        self.status = BatchStatus::Ordered;
        self.purchase_order_number = Some(po.to_string());
        Ok(())
    }

    pub fn mark_received(&mut self) -> Result<(), BatchError> {
        self.expect(BatchStatus::Ordered)?;
        self.status = BatchStatus::Received;
        Ok(())
    }

    pub fn job_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.lines.iter().map(|l| l.job_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn purchase_order(&self) -> PurchaseOrder {
        let mut by_variant: BTreeMap<&str, PurchaseOrderLine> = BTreeMap::new();
        for l in &self.lines {
            let row = by_variant.entry(l.variant_id.as_str()).or_insert_with(|| PurchaseOrderLine {
                variant_id: l.variant_id.clone(), title: l.title.clone(), quantity: 0, total_cost: Decimal::ZERO,
            });
            row.quantity += i64::from(l.quantity);
            row.total_cost += l.unit_price * Decimal::from(l.quantity);
        }
        let lines: Vec<PurchaseOrderLine> = by_variant.into_values().collect();
        PurchaseOrder {
            batch_id: self.id, collection_id: self.collection_id.clone(), purchase_order_number: self.purchase_order_number.clone(),
            total_quantity: lines.iter().map(|l| l.quantity).sum(), total_cost: lines.iter().map(|l| l.total_cost).sum(), lines,
        }
    }

    fn expect(&self, status: BatchStatus) -> Result<(), BatchError> {
        if self.status != status { return Err(BatchError::WrongStatus { expected: status, actual: self.status }); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    MissingCollection,
    InvalidPeriod,
    NotOpen(BatchStatus),
    NotEmpty,
    CollectionMismatch,
    MissingPurchaseOrder,
    WrongStatus { expected: BatchStatus, actual: BatchStatus },
    Job(JobError),
}
impl std::error::Error for BatchError {}
impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCollection => write!(f, "Batch has no collection"),
            Self::InvalidPeriod => write!(f, "Batch period must end after it starts"),
            Self::NotOpen(s) => write!(f, "Batch is {s}, not open"),
            Self::NotEmpty => write!(f, "Batch already has lines"),
            Self::CollectionMismatch => write!(f, "Job belongs to a different collection"),
            Self::MissingPurchaseOrder => write!(f, "Purchase order number is required"),
            Self::WrongStatus { expected, actual } => write!(f, "Batch must be {expected} (is {actual})"),
            Self::Job(e) => write!(f, "{e}"),
        }
    }
}
impl From<JobError> for BatchError { fn from(e: JobError) -> Self { Self::Job(e) } }

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::aggregates::job::{JobItem, JobStatus};
    use crate::domain::value_objects::Quantity;

    fn approved_job(collection: &str, lines: &[(&str, i32, i64)]) -> Job {
        let items = lines.iter().map(|(v, q, cents)| JobItem::new(*v, format!("Item {v}"), Quantity::new(*q).unwrap(), Decimal::new(*cents, 2))).collect();
        let mut job = Job::create(Uuid::now_v7(), collection, items).unwrap();
        job.transition(JobStatus::Approved, None).unwrap();
        job
    }

    fn batch() -> Batch { let now = Utc::now(); Batch::open("coll-1", now, now + Duration::days(7)).unwrap() }

    #[test]
    fn test_open_validates_period() {
        let now = Utc::now();
        assert_eq!(Batch::open("coll-1", now, now).unwrap_err(), BatchError::InvalidPeriod);
        assert_eq!(Batch::open("", now, now + Duration::days(1)).unwrap_err(), BatchError::MissingCollection);
    }

    #[test]
    fn test_batch_lifecycle() {
        let mut b = batch();
        let mut job = approved_job("coll-1", &[("v1", 2, 500)]);
        assert_eq!(b.add_job(&mut job).unwrap().len(), 1);
        assert_eq!(job.batch_id, Some(b.id));
        assert!(matches!(b.mark_ordered("PO-1"), Err(BatchError::WrongStatus { expected: BatchStatus::Closed, actual: BatchStatus::Open })));
        b.close().unwrap();
        assert!(b.closed_at.is_some());
        let mut late = approved_job("coll-1", &[("v1", 1, 500)]);
        assert_eq!(b.add_job(&mut late).unwrap_err(), BatchError::NotOpen(BatchStatus::Closed));
        assert_eq!(late.batch_id, None);
        assert_eq!(b.mark_ordered("  "), Err(BatchError::MissingPurchaseOrder));
        b.mark_ordered(" PO-1 ").unwrap();
        assert_eq!(b.purchase_order_number.as_deref(), Some("PO-1"));
        b.mark_received().unwrap();
        assert_eq!(b.status, BatchStatus::Received);
        assert!(b.close().is_err());
    }

    #[test]
    fn test_add_job_rules() {
        let mut b = batch();
        let mut other = approved_job("coll-2", &[("v1", 1, 100)]);
        assert_eq!(b.add_job(&mut other).unwrap_err(), BatchError::CollectionMismatch);
        let mut job = approved_job("coll-1", &[("v1", 1, 100)]);
        b.add_job(&mut job).unwrap();
        assert_eq!(b.add_job(&mut job).unwrap_err(), BatchError::Job(JobError::AlreadyBatched));
        assert_eq!(b.lines.len(), 1);
    }

    #[test]
    fn test_remove_job() {
        let mut b = batch();
        let mut keep = approved_job("coll-1", &[("v1", 1, 100)]);
        let mut drop = approved_job("coll-1", &[("v2", 3, 800), ("v3", 1, 100)]);
        b.add_job(&mut keep).unwrap();
        b.add_job(&mut drop).unwrap();
        b.remove_job(&mut drop).unwrap();
        assert_eq!(drop.batch_id, None);
        assert_eq!(b.job_ids(), [keep.id]);
        assert_eq!(b.purchase_order().total_quantity, 1);
        assert_eq!(b.remove_job(&mut drop), Err(BatchError::Job(JobError::NotInBatch(b.id))));
        b.close().unwrap();
        assert_eq!(b.remove_job(&mut keep), Err(BatchError::NotOpen(BatchStatus::Closed)));
        assert_eq!(keep.batch_id, Some(b.id));
    }

    #[test]
    fn test_cancel_only_when_empty() {
        let mut b = batch();
        let mut job = approved_job("coll-1", &[("v1", 1, 100)]);
        b.add_job(&mut job).unwrap();
        assert_eq!(b.cancel(), Err(BatchError::NotEmpty));
        let mut empty = batch();
        empty.cancel().unwrap();
        assert_eq!(empty.status, BatchStatus::Cancelled);
    }

    #[test]
    fn test_purchase_order_aggregates_by_variant() {
        let mut b = batch();
        let mut a = approved_job("coll-1", &[("v2", 3, 1000), ("v1", 1, 250)]);
        let mut c = approved_job("coll-1", &[("v2", 2, 1000)]);
        b.add_job(&mut a).unwrap();
        b.add_job(&mut c).unwrap();
        let po = b.purchase_order();
        assert_eq!(po.lines.iter().map(|l| l.variant_id.as_str()).collect::<Vec<_>>(), ["v1", "v2"]);
        assert_eq!(po.lines[1].quantity, 5);
        assert_eq!(po.lines[1].total_cost, Decimal::new(5000, 2));
        assert_eq!(po.total_quantity, 6);
        assert_eq!(po.total_cost, Decimal::new(5250, 2));
        assert_eq!(b.job_ids().len(), 2);
    }
}
