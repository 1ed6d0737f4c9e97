//! Job Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::JobEvent;
use crate::domain::value_objects::{Money, Quantity};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub number: String,
    pub customer_id: Uuid,
    pub collection_id: String,
    pub status: JobStatus,
    pub items: Vec<JobItem>,
    pub batch_id: Option<Uuid>,
    pub reorder_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Row version at load; saves against a stale version fail.
    #[serde(skip)]
    pub version: i32,
    /// Events raised since load; drained by the store on save.
    #[serde(skip)]
    pub pending_events: Vec<JobEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobItem { pub id: Uuid, pub variant_id: String, pub title: String, pub quantity: Quantity, pub unit_price: Decimal }

impl JobItem {
    pub fn new(variant_id: impl Into<String>, title: impl Into<String>, quantity: Quantity, unit_price: Decimal) -> Self {
        Self { id: Uuid::now_v7(), variant_id: variant_id.into(), title: title.into(), quantity, unit_price }
    }
    pub fn line_total(&self) -> Money { Money::usd(self.unit_price).multiply(self.quantity.value()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus { #[default] Pending, Approved, InProduction, Shipped, Delivered, Cancelled }

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::InProduction => "in_production",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "in_production" => Self::InProduction,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Approved, InProduction) | (InProduction, Shipped) | (Shipped, Delivered)
                | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Job {
    pub fn create(customer_id: Uuid, collection_id: impl Into<String>, items: Vec<JobItem>) -> Result<Self, JobError> {
        Self::build(customer_id, collection_id.into(), items, None)
    }

    fn build(customer_id: Uuid, collection_id: String, items: Vec<JobItem>, reorder_of: Option<Uuid>) -> Result<Self, JobError> {
        if items.is_empty() { return Err(JobError::NoItems); }
        if collection_id.trim().is_empty() { return Err(JobError::MissingCollection); }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut job = Self {
            id, number: next_number(), customer_id, collection_id,
            status: JobStatus::Pending, items, batch_id: None, reorder_of, created_at: now, updated_at: now,
            version: 0, pending_events: vec![],
        };
        job.raise_event(JobEvent::created(id, reorder_of));
        Ok(job)
    }

    /// Draws a fresh job number, for when the current one is already taken.
    pub fn renumber(&mut self) { self.number = next_number(); }

    pub fn total(&self) -> Money {
        self.items.iter().fold(Money::zero("USD"), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn transition(&mut self, to: JobStatus, note: Option<&str>) -> Result<(), JobError> {
        if !self.status.can_transition_to(to) { return Err(JobError::IllegalTransition { from: self.status, to }); }
        if let (JobStatus::Cancelled, Some(batch_id)) = (to, self.batch_id) { return Err(JobError::InBatch(batch_id)); }
        let from = self.status;
        self.status = to;
        self.touch();
        self.raise_event(JobEvent::status_changed(self.id, from, to, note));
        Ok(())
    }

    pub fn assign_batch(&mut self, batch_id: Uuid) -> Result<(), JobError> {
        if self.batch_id.is_some() { return Err(JobError::AlreadyBatched); }
        if self.status != JobStatus::Approved { return Err(JobError::NotApproved(self.status)); }
        self.batch_id = Some(batch_id);
        self.touch();
        self.raise_event(JobEvent::batched(self.id, batch_id));
        Ok(())
    }

    pub fn release_batch(&mut self, batch_id: Uuid) -> Result<(), JobError> {
        if self.batch_id != Some(batch_id) { return Err(JobError::NotInBatch(batch_id)); }
        self.batch_id = None;
        self.touch();
        self.raise_event(JobEvent::unbatched(self.id, batch_id));
        Ok(())
    }

    pub fn add_note(&mut self, text: &str) -> Result<(), JobError> {
        let text = text.trim();
        if text.is_empty() { return Err(JobError::EmptyNote); }
        self.touch();
        self.raise_event(JobEvent::note(self.id, text));
        Ok(())
    }

    /// New pending job copying this job's items. `overrides` replaces the
    /// quantity of the item with the given id.
    pub fn reorder(&mut self, overrides: &[(Uuid, Quantity)]) -> Result<Job, JobError> {
        if !matches!(self.status, JobStatus::Shipped | JobStatus::Delivered) { return Err(JobError::NotReorderable(self.status)); }
        if let Some((unknown, _)) = overrides.iter().find(|(id, _)| !self.items.iter().any(|i| i.id == *id)) {
            return Err(JobError::UnknownItem(*unknown));
        }
        let items = self.items.iter().map(|i| {
            let quantity = overrides.iter().find(|(id, _)| *id == i.id).map(|(_, q)| *q).unwrap_or(i.quantity);
            JobItem::new(i.variant_id.clone(), i.title.clone(), quantity, i.unit_price)
        }).collect();
        let reorder = Self::build(self.customer_id, self.collection_id.clone(), items, Some(self.id))?;
        self.touch();
        self.raise_event(JobEvent::reorder_requested(self.id, reorder.id));
        Ok(reorder)
    }

    pub fn take_events(&mut self) -> Vec<JobEvent> { std::mem::take(&mut self.pending_events) }
    fn raise_event(&mut self, e: JobEvent) { self.pending_events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn next_number() -> String { format!("JOB-{:08}", rand::random::<u32>() % 100_000_000) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    NoItems,
    MissingCollection,
    EmptyNote,
    AlreadyBatched,
    InBatch(Uuid),
    NotInBatch(Uuid),
    NotApproved(JobStatus),
    NotReorderable(JobStatus),
    UnknownItem(Uuid),
    IllegalTransition { from: JobStatus, to: JobStatus },
}
impl std::error::Error for JobError {}
impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Job has no items"),
            Self::MissingCollection => write!(f, "Job has no collection"),
            Self::EmptyNote => write!(f, "Note is empty"),
            Self::AlreadyBatched => write!(f, "Job is already in a batch"),
            Self::InBatch(b) => write!(f, "Job is in batch {b}; remove it from the batch first"),
            Self::NotInBatch(b) => write!(f, "Job is not in batch {b}"),
            Self::NotApproved(s) => write!(f, "Job must be approved to be batched (is {s})"),
            Self::NotReorderable(s) => write!(f, "Only shipped or delivered jobs can be reordered (is {s})"),
            Self::UnknownItem(id) => write!(f, "Job has no item {id}"),
            Self::IllegalTransition { from, to } => write!(f, "Cannot move job from {from} to {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::JobEventKind;

    fn item(qty: i32) -> JobItem { JobItem::new("gid://shopify/ProductVariant/1", "Tour Tee / L", Quantity::new(qty).unwrap(), Decimal::new(1250, 2)) }

    #[test]
    fn test_job_workflow() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(2)]).unwrap();
        assert!(job.number.starts_with("JOB-"));
        assert_eq!(job.total().amount(), Decimal::new(2500, 2));
        job.transition(JobStatus::Approved, Some("looks good")).unwrap();
        job.transition(JobStatus::InProduction, None).unwrap();
        job.transition(JobStatus::Shipped, None).unwrap();
        job.transition(JobStatus::Delivered, None).unwrap();
        assert_eq!(job.status, JobStatus::Delivered);
        let kinds: Vec<_> = job.take_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [JobEventKind::Created, JobEventKind::StatusChanged, JobEventKind::StatusChanged, JobEventKind::StatusChanged, JobEventKind::StatusChanged]);
        assert!(job.take_events().is_empty());
    }

    #[test]
    fn test_illegal_transitions() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(1)]).unwrap();
        assert_eq!(job.transition(JobStatus::Shipped, None), Err(JobError::IllegalTransition { from: JobStatus::Pending, to: JobStatus::Shipped }));
        assert!(job.transition(JobStatus::Pending, None).is_err());
        job.transition(JobStatus::Cancelled, None).unwrap();
        assert!(job.transition(JobStatus::Approved, None).is_err());
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn test_create_requires_items() {
        assert_eq!(Job::create(Uuid::now_v7(), "coll-1", vec![]).unwrap_err(), JobError::NoItems);
        assert_eq!(Job::create(Uuid::now_v7(), " ", vec![item(1)]).unwrap_err(), JobError::MissingCollection);
    }

    #[test]
    fn test_assign_batch() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(1)]).unwrap();
        assert!(matches!(job.assign_batch(Uuid::now_v7()), Err(JobError::NotApproved(JobStatus::Pending))));
        job.transition(JobStatus::Approved, None).unwrap();
        let batch = Uuid::now_v7();
        job.assign_batch(batch).unwrap();
        assert_eq!(job.batch_id, Some(batch));
        assert_eq!(job.assign_batch(Uuid::now_v7()), Err(JobError::AlreadyBatched));
    }

    #[test]
    fn test_batched_job_cannot_be_cancelled_until_released() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(1)]).unwrap();
        job.transition(JobStatus::Approved, None).unwrap();
        let batch = Uuid::now_v7();
        job.assign_batch(batch).unwrap();
        assert_eq!(job.transition(JobStatus::Cancelled, None), Err(JobError::InBatch(batch)));
        assert_eq!(job.status, JobStatus::Approved);
        assert_eq!(job.release_batch(Uuid::nil()), Err(JobError::NotInBatch(Uuid::nil())));
        job.release_batch(batch).unwrap();
        job.transition(JobStatus::Cancelled, None).unwrap();
        let kinds: Vec<_> = job.take_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds[2..], [JobEventKind::Batched, JobEventKind::Unbatched, JobEventKind::StatusChanged]);
    }

    #[test]
    fn test_renumber() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(1)]).unwrap();
        job.renumber();
        assert!(job.number.starts_with("JOB-"));
        assert_eq!(job.number.len(), 12);
    }

    #[test]
    fn test_reorder() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(2), item(5)]).unwrap();
        assert!(matches!(job.reorder(&[]), Err(JobError::NotReorderable(JobStatus::Pending))));
        for s in [JobStatus::Approved, JobStatus::InProduction, JobStatus::Shipped] { job.transition(s, None).unwrap(); }
        job.take_events();
        let first = job.items[0].id;
        let again = job.reorder(&[(first, Quantity::new(10).unwrap())]).unwrap();
        assert_eq!(again.reorder_of, Some(job.id));
        assert_eq!(again.status, JobStatus::Pending);
        assert_eq!(again.items[0].quantity.value(), 10);
        assert_eq!(again.items[1].quantity.value(), 5);
        assert_ne!(again.items[0].id, first);
        let events = job.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["new_job_id"], again.id.to_string());
        assert_eq!(job.reorder(&[(Uuid::nil(), Quantity::new(1).unwrap())]).unwrap_err(), JobError::UnknownItem(Uuid::nil()));
    }

    #[test]
    fn test_notes() {
        let mut job = Job::create(Uuid::now_v7(), "coll-1", vec![item(1)]).unwrap();
        assert_eq!(job.add_note("   "), Err(JobError::EmptyNote));
        job.add_note("rush please").unwrap();
        assert_eq!(job.take_events().last().unwrap().payload["text"], "rush please");
    }
}
