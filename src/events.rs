//! Best-effort fan-out of job events to NATS.

use crate::domain::events::JobEvent;

pub const JOB_EVENTS_SUBJECT: &str = "merch.jobs.events";

pub async fn publish_job_events(nats: Option<&async_nats::Client>, events: &[JobEvent]) {
    let Some(client) = nats else { return };
    for event in events {
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, "could not encode job event"); continue; }
        };
        if let Err(e) = client.publish(JOB_EVENTS_SUBJECT.to_string(), payload.into()).await {
            tracing::warn!(error = %e, job_id = %event.job_id, kind = event.kind.as_str(), "failed to publish job event");
        }
    }
}
