//! Job event log entries
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::JobStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind { Created, StatusChanged, Batched, Unbatched, ReorderRequested, Note }

impl JobEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::Batched => "batched",
            Self::Unbatched => "unbatched",
            Self::ReorderRequested => "reorder_requested",
            Self::Note => "note",
        }
    }
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "created" => Self::Created,
            "status_changed" => Self::StatusChanged,
            "batched" => Self::Batched,
            "unbatched" => Self::Unbatched,
            "reorder_requested" => Self::ReorderRequested,
            "note" => Self::Note,
            _ => return None,
        })
    }
}

/// One append-only entry in a job's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub job_id: Uuid,
    pub kind: JobEventKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl JobEvent {
    fn new(job_id: Uuid, kind: JobEventKind, payload: serde_json::Value) -> Self {
        Self { id: Uuid::now_v7(), job_id, kind, payload, created_at: Utc::now() }
    }
    pub fn created(job_id: Uuid, reorder_of: Option<Uuid>) -> Self {
        Self::new(job_id, JobEventKind::Created, serde_json::json!({ "reorder_of": reorder_of }))
    }
    pub fn status_changed(job_id: Uuid, from: JobStatus, to: JobStatus, note: Option<&str>) -> Self {
        Self::new(job_id, JobEventKind::StatusChanged, serde_json::json!({ "from": from, "to": to, "note": note }))
    }
    pub fn batched(job_id: Uuid, batch_id: Uuid) -> Self {
        Self::new(job_id, JobEventKind::Batched, serde_json::json!({ "batch_id": batch_id }))
    }
    pub fn unbatched(job_id: Uuid, batch_id: Uuid) -> Self {
        Self::new(job_id, JobEventKind::Unbatched, serde_json::json!({ "batch_id": batch_id }))
    }
    pub fn reorder_requested(job_id: Uuid, new_job_id: Uuid) -> Self {
        Self::new(job_id, JobEventKind::ReorderRequested, serde_json::json!({ "new_job_id": new_job_id }))
    }
    pub fn note(job_id: Uuid, text: &str) -> Self {
        Self::new(job_id, JobEventKind::Note, serde_json::json!({ "text": text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_status_changed_payload() {
        let e = JobEvent::status_changed(Uuid::nil(), JobStatus::Pending, JobStatus::Approved, Some("ok"));
        assert_eq!(e.kind, JobEventKind::StatusChanged);
        assert_eq!(e.payload["from"], "pending");
        assert_eq!(e.payload["to"], "approved");
        assert_eq!(e.payload["note"], "ok");
    }
    #[test]
    fn test_kind_names() {
        for k in [JobEventKind::Created, JobEventKind::StatusChanged, JobEventKind::Batched, JobEventKind::Unbatched, JobEventKind::ReorderRequested, JobEventKind::Note] {
            assert_eq!(JobEventKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(JobEventKind::parse("deleted"), None);
    }
}
