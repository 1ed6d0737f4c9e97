//! Periodic batch rollover, driven by the cron endpoint.
//!
//! Each drop shop with a cadence owns a due date. When it passes, the
//! collection's open batch is closed and the next period's batch opened.
//! The due date moves forward on every rollover, so calling this again
//! before the next due date does nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Batch;
use crate::{ApiResult, AppState};

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SchedulerReport { pub closed: Vec<Uuid>, pub opened: Vec<Uuid>, pub skipped: usize }

pub async fn run_due(state: &AppState, now: DateTime<Utc>) -> ApiResult<SchedulerReport> {
    let mut report = SchedulerReport::default();
    for mut shop in state.store.list_drop_shops().await? {
        let Some(cadence) = shop.cadence() else { continue };
        if !shop.is_batch_due(now) {
            report.skipped += 1;
            continue;
        }
        let first_run = shop.next_batch_due.is_none();
        let open = state.store.find_open_batch(&shop.collection_id).await?;
        match open {
            // First scheduled run keeps a batch that was opened by hand.
            Some(_) if first_run => {}
            Some(mut batch) => {
                batch.close()?;
                state.store.save_batch(&mut batch, &[], &mut []).await?;
                tracing::info!(batch_id = %batch.id, shop = %shop.slug, "scheduled batch closed");
                report.closed.push(batch.id);
                report.opened.push(open_next(state, &shop.collection_id, now, now + cadence).await?);
            }
            None => report.opened.push(open_next(state, &shop.collection_id, now, now + cadence).await?),
        }
        if let Some(next) = shop.advance_schedule(now) {
            state.store.update_drop_shop(&shop).await?;
            tracing::debug!(shop = %shop.slug, %next, "next batch due");
        }
    }
    tracing::info!(closed = report.closed.len(), opened = report.opened.len(), skipped = report.skipped, "batch scheduler run");
    Ok(report)
}

async fn open_next(state: &AppState, collection_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ApiResult<Uuid> {
    let batch = Batch::open(collection_id, start, end)?;
    state.store.insert_batch(&batch).await?;
    tracing::info!(batch_id = %batch.id, collection_id, %end, "scheduled batch opened");
    Ok(batch.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::domain::aggregates::{BatchStatus, DropShop, ThemeMode};
    use crate::domain::value_objects::{HexColor, Slug};
    use crate::services::test_support::state;
    use crate::store::BatchFilter;

    async fn shop(state: &AppState, slug: &str, collection: &str, cadence: Option<i32>) {
        let mut s = DropShop::create(Slug::new(slug).unwrap(), slug, collection, slug, HexColor::new("#336699").unwrap(), ThemeMode::Light).unwrap();
        s.set_cadence(cadence).unwrap();
        state.store.insert_drop_shop(&s).await.unwrap();
    }

    #[tokio::test]
    async fn test_rollover_is_idempotent_within_period() {
        let state = state();
        shop(&state, "tour", "coll-1", Some(7)).await;
        shop(&state, "static", "coll-2", None).await;
        let t0 = Utc::now();

        let first = run_due(&state, t0).await.unwrap();
        assert_eq!(first.opened.len(), 1);
        assert!(first.closed.is_empty());

        let again = run_due(&state, t0 + Duration::days(3)).await.unwrap();
        assert_eq!(again, SchedulerReport { closed: vec![], opened: vec![], skipped: 1 });

        let rollover = run_due(&state, t0 + Duration::days(7)).await.unwrap();
        assert_eq!(rollover.closed, first.opened);
        assert_eq!(rollover.opened.len(), 1);

        let batches = state.store.list_batches(&BatchFilter { collection_id: Some("coll-1".into()), status: None }).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches.iter().filter(|b| b.status == BatchStatus::Open).count(), 1);
        let next = state.store.get_drop_shop("tour").await.unwrap().unwrap().next_batch_due.unwrap();
        assert_eq!(next, t0 + Duration::days(14));
        assert!(state.store.find_open_batch("coll-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_run_keeps_manual_batch() {
        let state = state();
        shop(&state, "tour", "coll-1", Some(7)).await;
        let now = Utc::now();
        let manual = Batch::open("coll-1", now - Duration::days(1), now + Duration::days(2)).unwrap();
        state.store.insert_batch(&manual).await.unwrap();
        let report = run_due(&state, now).await.unwrap();
        assert!(report.opened.is_empty() && report.closed.is_empty());
        assert_eq!(state.store.find_open_batch("coll-1").await.unwrap().unwrap().id, manual.id);
    }
}
