//! Single-level undo for manual moves.
//!
//! Only the most recent move is reversible, and only for a short window
//! after it happened; a new move overwrites the previous record. Undo is
//! best-effort: when the inverse write fails, the store is re-read so the
//! caller can reconcile instead of assuming success.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::Job;
use crate::store::JobStore;

/// The single reversible action.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub job_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Scheduled time before the move.
    pub scheduled_time: Option<NaiveTime>,
    /// Order before the move.
    pub order: Option<i32>,
    captured_at: Instant,
}

impl UndoRecord {
    pub fn new(
        job_id: Uuid,
        from_date: NaiveDate,
        to_date: NaiveDate,
        scheduled_time: Option<NaiveTime>,
        order: Option<i32>,
    ) -> Self {
        Self {
            job_id,
            from_date,
            to_date,
            scheduled_time,
            order,
            captured_at: Instant::now(),
        }
    }
}

/// Result of an undo attempt.
#[derive(Debug)]
pub enum UndoOutcome {
    /// The move was reverted; this is the restored job.
    Undone(Job),
    /// Nothing to undo: no record, expired window, or the job vanished.
    Unavailable,
    /// The inverse write failed. The store was re-read; `observed` is the
    /// job as it stands now (if it could be read back).
    Reconciled { observed: Option<Job> },
}

/// Tracks the most recent move and applies its inverse on request.
pub struct UndoController {
    window: Duration,
    record: Option<UndoRecord>,
}

impl UndoController {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            record: None,
        }
    }

    /// Remember a move, overwriting any previous record.
    pub fn record(&mut self, record: UndoRecord) {
        self.record = Some(record);
    }

    /// Whether the undo affordance is currently alive.
    pub fn can_undo(&self) -> bool {
        self.can_undo_at(Instant::now())
    }

    /// Expiry measured against the supplied instant, so tests can simulate
    /// the clock.
    pub fn can_undo_at(&self, now: Instant) -> bool {
        self.record
            .as_ref()
            .is_some_and(|r| now.duration_since(r.captured_at) <= self.window)
    }

    /// Undo the recorded move.
    pub async fn undo(&mut self, store: &dyn JobStore) -> Result<UndoOutcome, StoreError> {
        self.undo_at(Instant::now(), store).await
    }

    /// [`UndoController::undo`] with an explicit clock.
    pub async fn undo_at(
        &mut self,
        now: Instant,
        store: &dyn JobStore,
    ) -> Result<UndoOutcome, StoreError> {
        if !self.can_undo_at(now) {
            self.record = None;
            return Ok(UndoOutcome::Unavailable);
        }
        let Some(record) = self.record.take() else {
            return Ok(UndoOutcome::Unavailable);
        };

        let jobs = store.fetch_jobs().await?;
        let Some(job) = jobs.into_iter().find(|j| j.id == record.job_id) else {
            return Ok(UndoOutcome::Unavailable);
        };

        let mut reverted = job;
        reverted.date = record.from_date;
        reverted.scheduled_time = record.scheduled_time;
        reverted.order = record.order;

        match store.update_job(&reverted).await {
            Ok(restored) => Ok(UndoOutcome::Undone(restored)),
            Err(e) => {
                tracing::warn!("Undo write failed for job {}: {}", record.job_id, e);
                let observed = store
                    .fetch_jobs()
                    .await
                    .ok()
                    .and_then(|jobs| jobs.into_iter().find(|j| j.id == record.job_id));
                Ok(UndoOutcome::Reconciled { observed })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::model::NewJob;
    use crate::store::InMemoryJobStore;

    /// Serves reads but rejects every write.
    struct ReadOnlyStore {
        inner: InMemoryJobStore,
    }

    #[async_trait]
    impl JobStore for ReadOnlyStore {
        async fn fetch_jobs(&self) -> Result<Vec<Job>, StoreError> {
            self.inner.fetch_jobs().await
        }

        async fn add_job(&self, new: NewJob) -> Result<Job, StoreError> {
            self.inner.add_job(new).await
        }

        async fn update_job(&self, _job: &Job) -> Result<Job, StoreError> {
            Err(StoreError::Backend {
                reason: "read-only".to_string(),
            })
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn controller() -> UndoController {
        UndoController::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_undo_within_window_restores_prior_state() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut job = Job::new(Uuid::new_v4(), date(8));
        job.order = Some(3);
        store.seed(job.clone()).await;

        // The job was moved 7th -> 8th at 9:00 -> now; undo restores both
        // the date and the prior scheduled time.
        let prior_time = NaiveTime::from_hms_opt(9, 0, 0);
        let mut undo = controller();
        undo.record(UndoRecord::new(job.id, date(7), date(8), prior_time, Some(1)));
        assert!(undo.can_undo());

        match undo.undo(store.as_ref()).await.unwrap() {
            UndoOutcome::Undone(restored) => {
                assert_eq!(restored.date, date(7));
                assert_eq!(restored.scheduled_time, prior_time);
                assert_eq!(restored.order, Some(1));
            }
            other => panic!("expected undo, got {:?}", other),
        }

        // Single level: the record is consumed.
        assert!(!undo.can_undo());
    }

    #[tokio::test]
    async fn test_undo_expires_after_window() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = Job::new(Uuid::new_v4(), date(8));
        store.seed(job.clone()).await;

        let mut undo = controller();
        undo.record(UndoRecord::new(job.id, date(7), date(8), None, None));

        let after_window = Instant::now() + Duration::from_secs(6);
        assert!(!undo.can_undo_at(after_window));
        assert!(matches!(
            undo.undo_at(after_window, store.as_ref()).await.unwrap(),
            UndoOutcome::Unavailable
        ));

        let unchanged = store.fetch_jobs().await.unwrap().remove(0);
        assert_eq!(unchanged.date, date(8));
    }

    #[tokio::test]
    async fn test_new_record_overwrites_previous() {
        let store = Arc::new(InMemoryJobStore::new());
        let first = Job::new(Uuid::new_v4(), date(8));
        let second = Job::new(Uuid::new_v4(), date(9));
        store.seed(first.clone()).await;
        store.seed(second.clone()).await;

        let mut undo = controller();
        undo.record(UndoRecord::new(first.id, date(7), date(8), None, None));
        undo.record(UndoRecord::new(second.id, date(7), date(9), None, None));

        match undo.undo(store.as_ref()).await.unwrap() {
            UndoOutcome::Undone(restored) => assert_eq!(restored.id, second.id),
            other => panic!("expected undo of the second move, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_vanished_job_is_unavailable() {
        let store = Arc::new(InMemoryJobStore::new());

        // The recorded job is absent from the store entirely.
        let ghost = Job::new(Uuid::new_v4(), date(8));
        let mut undo = controller();
        undo.record(UndoRecord::new(ghost.id, date(7), date(8), None, None));

        assert!(matches!(
            undo.undo(store.as_ref()).await.unwrap(),
            UndoOutcome::Unavailable
        ));
    }

    #[tokio::test]
    async fn test_failed_inverse_reconciles_from_store() {
        let inner = InMemoryJobStore::new();
        let job = Job::new(Uuid::new_v4(), date(8));
        inner.seed(job.clone()).await;
        let store = ReadOnlyStore { inner };

        let mut undo = controller();
        undo.record(UndoRecord::new(job.id, date(7), date(8), None, None));

        // The inverse write fails; the observed state comes from a fresh
        // read, still on the 8th.
        match undo.undo(&store).await.unwrap() {
            UndoOutcome::Reconciled { observed } => {
                assert_eq!(observed.map(|j| j.date), Some(date(8)));
            }
            other => panic!("expected reconciliation, got {:?}", other),
        }
    }
}
