//! Manual reordering of jobs within and across days.
//!
//! Follows the optimistic-update pattern: `plan` computes the new records
//! without touching the store, `commit` persists them individually, and a
//! partial failure triggers a store re-read so the caller sees what
//! actually stuck.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::model::{DayTimingOverrides, Job};
use crate::schedule::slots;
use crate::schedule::undo::{UndoController, UndoRecord};
use crate::store::JobStore;

/// A manual move of one job.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub job_id: Uuid,
    pub target_date: NaiveDate,
    /// Desired position within the target day, clamped to the day's length.
    pub target_index: usize,
}

/// Optimistic result of planning a move: every record that changes.
#[derive(Debug, Clone)]
pub struct MovePlan {
    pub updated: Vec<Job>,
    pub undo: UndoRecord,
}

/// Persistence tally for a committed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub persisted: usize,
    pub failed: usize,
}

/// Result of a manual move.
#[derive(Debug)]
pub enum MoveOutcome {
    /// The move was applied. `jobs` holds the changed records, re-read
    /// from the store when any write failed.
    Moved { commit: CommitOutcome, jobs: Vec<Job> },
    /// Source job missing, or the move changed nothing.
    Noop,
}

/// Applies manual moves and remembers them for undo.
pub struct ReorderController {
    jobs: Arc<dyn JobStore>,
    undo: UndoController,
}

impl ReorderController {
    pub fn new(config: &EngineConfig, jobs: Arc<dyn JobStore>) -> Self {
        Self {
            jobs,
            undo: UndoController::new(config.undo_window),
        }
    }

    /// The undo controller for the most recent move.
    pub fn undo_controller(&mut self) -> &mut UndoController {
        &mut self.undo
    }

    /// Plan a move without touching the store.
    ///
    /// Returns `None` when the job cannot be located or the move is a
    /// no-op (same day, same position).
    pub fn plan(
        all_jobs: &[Job],
        request: &MoveRequest,
        overrides: &DayTimingOverrides,
    ) -> Option<MovePlan> {
        let source = all_jobs.iter().find(|j| j.id == request.job_id)?;
        let from_date = source.date;
        let undo = UndoRecord::new(
            source.id,
            from_date,
            request.target_date,
            source.scheduled_time,
            source.order,
        );

        let mut source_day = day_in_display_order(all_jobs, from_date);
        let source_index = source_day.iter().position(|j| j.id == request.job_id)?;

        let mut changed: Vec<Job> = Vec::new();

        if request.target_date == from_date {
            let target_index = request.target_index.min(source_day.len() - 1);
            if target_index == source_index {
                return None;
            }
            let moved = source_day.remove(source_index);
            source_day.insert(target_index, moved);
            renumber(&source_day, &mut changed);
        } else {
            source_day.remove(source_index);
            renumber(&source_day, &mut changed);

            let mut target_day = day_in_display_order(all_jobs, request.target_date);
            let target_index = request.target_index.min(target_day.len());
            target_day.insert(target_index, source);
            renumber(&target_day, &mut changed);

            // The moved job crosses days: rewrite its date and derive its
            // new arrival time from the destination day's window.
            let start = overrides.start_for(request.target_date);
            let shift = start.saturating_sub(crate::model::DEFAULT_DAY_START_HOUR) as usize;
            if let Some(moved) = changed.iter_mut().find(|j| j.id == request.job_id) {
                moved.date = request.target_date;
                moved.scheduled_time = Some(slots::time_for_slot(target_index + shift, start));
            } else if let Some(moved) = all_jobs.iter().find(|j| j.id == request.job_id) {
                let mut moved = moved.clone();
                moved.date = request.target_date;
                moved.scheduled_time = Some(slots::time_for_slot(target_index + shift, start));
                changed.push(moved);
            }
        }

        if changed.is_empty() {
            return None;
        }
        Some(MovePlan {
            updated: changed,
            undo,
        })
    }

    /// Persist a plan, attempting every job even when some writes fail.
    pub async fn commit(&self, plan: &MovePlan) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();
        for job in &plan.updated {
            match self.jobs.update_job(job).await {
                Ok(_) => outcome.persisted += 1,
                Err(e) => {
                    tracing::warn!("Reorder write failed for job {}: {}", job.id, e);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Plan, commit, and record the move for undo.
    pub async fn move_job(
        &mut self,
        request: &MoveRequest,
        overrides: &DayTimingOverrides,
    ) -> Result<MoveOutcome, StoreError> {
        let all_jobs = self.jobs.fetch_jobs().await?;
        let Some(plan) = Self::plan(&all_jobs, request, overrides) else {
            return Ok(MoveOutcome::Noop);
        };

        let commit = self.commit(&plan).await;

        let jobs = if commit.failed > 0 {
            // Optimistic state is unreliable; trust the store instead.
            let fresh = self.jobs.fetch_jobs().await?;
            let ids: Vec<Uuid> = plan.updated.iter().map(|j| j.id).collect();
            fresh
                .into_iter()
                .filter(|j| ids.contains(&j.id))
                .collect()
        } else {
            plan.updated.clone()
        };

        self.undo.record(plan.undo.clone());
        Ok(MoveOutcome::Moved { commit, jobs })
    }
}

/// A day's jobs in display order: active before completed, then route
/// order.
fn day_in_display_order(all_jobs: &[Job], date: NaiveDate) -> Vec<&Job> {
    let mut day: Vec<&Job> = all_jobs.iter().filter(|j| j.date == date).collect();
    day.sort_by(|a, b| slots::display_cmp(a, b));
    day
}

/// Renumber a day's list 1..N, collecting every job whose order changes.
fn renumber(day: &[&Job], changed: &mut Vec<Job>) {
    for (position, job) in day.iter().enumerate() {
        let new_order = Some(position as i32 + 1);
        if job.order == new_order {
            continue;
        }
        if let Some(existing) = changed.iter_mut().find(|c| c.id == job.id) {
            existing.order = new_order;
        } else {
            let mut updated = (*job).clone();
            updated.order = new_order;
            changed.push(updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::InMemoryJobStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn job(d: u32, order: i32) -> Job {
        let mut job = Job::new(Uuid::new_v4(), date(d));
        job.order = Some(order);
        job
    }

    async fn controller_with(jobs: &[Job]) -> (Arc<InMemoryJobStore>, ReorderController) {
        let store = Arc::new(InMemoryJobStore::new());
        for j in jobs {
            store.seed(j.clone()).await;
        }
        let controller = ReorderController::new(&EngineConfig::default(), store.clone());
        (store, controller)
    }

    #[tokio::test]
    async fn test_same_day_move_renumbers() {
        let a = job(7, 1);
        let b = job(7, 2);
        let c = job(7, 3);
        let (store, mut controller) = controller_with(&[a.clone(), b.clone(), c.clone()]).await;

        // Move C to the front.
        let request = MoveRequest {
            job_id: c.id,
            target_date: date(7),
            target_index: 0,
        };
        let outcome = controller
            .move_job(&request, &DayTimingOverrides::new())
            .await
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::Moved { commit, .. } if commit.failed == 0));

        let mut stored = store.fetch_jobs().await.unwrap();
        stored.sort_by_key(|j| j.order);
        assert_eq!(stored[0].id, c.id);
        assert_eq!(stored[0].order, Some(1));
        assert_eq!(stored[1].id, a.id);
        assert_eq!(stored[2].id, b.id);
        assert_eq!(stored[2].order, Some(3));
    }

    #[tokio::test]
    async fn test_same_position_is_noop() {
        let a = job(7, 1);
        let b = job(7, 2);
        let (_, mut controller) = controller_with(&[a.clone(), b]).await;

        let request = MoveRequest {
            job_id: a.id,
            target_date: date(7),
            target_index: 0,
        };
        assert!(matches!(
            controller
                .move_job(&request, &DayTimingOverrides::new())
                .await
                .unwrap(),
            MoveOutcome::Noop
        ));
    }

    #[tokio::test]
    async fn test_missing_job_is_noop() {
        let (_, mut controller) = controller_with(&[job(7, 1)]).await;
        let request = MoveRequest {
            job_id: Uuid::new_v4(),
            target_date: date(7),
            target_index: 0,
        };
        assert!(matches!(
            controller
                .move_job(&request, &DayTimingOverrides::new())
                .await
                .unwrap(),
            MoveOutcome::Noop
        ));
    }

    #[tokio::test]
    async fn test_cross_day_move_updates_date_and_time() {
        let a = job(7, 1);
        let b = job(7, 2);
        let x = job(8, 1);
        let (store, mut controller) = controller_with(&[a.clone(), b.clone(), x.clone()]).await;

        // Move B to the 8th, position 0: it lands at slot 0 = 5 AM.
        let request = MoveRequest {
            job_id: b.id,
            target_date: date(8),
            target_index: 0,
        };
        controller
            .move_job(&request, &DayTimingOverrides::new())
            .await
            .unwrap();

        let stored = store.fetch_jobs().await.unwrap();
        let moved = stored.iter().find(|j| j.id == b.id).unwrap();
        assert_eq!(moved.date, date(8));
        assert_eq!(moved.order, Some(1));
        assert_eq!(
            moved.scheduled_time,
            chrono::NaiveTime::from_hms_opt(5, 0, 0)
        );

        // The displaced job renumbers to 2; the source day closes up to 1.
        let displaced = stored.iter().find(|j| j.id == x.id).unwrap();
        assert_eq!(displaced.order, Some(2));
        let remaining = stored.iter().find(|j| j.id == a.id).unwrap();
        assert_eq!(remaining.order, Some(1));
    }

    #[tokio::test]
    async fn test_cross_day_respects_target_override() {
        let a = job(7, 1);
        let (store, mut controller) = controller_with(&[a.clone()]).await;

        let mut overrides = DayTimingOverrides::new();
        overrides.set(
            date(8),
            crate::model::DayTiming {
                start_hour: 10,
                end_hour: 18,
            },
        );

        let request = MoveRequest {
            job_id: a.id,
            target_date: date(8),
            target_index: 0,
        };
        controller.move_job(&request, &overrides).await.unwrap();

        let moved = store.fetch_jobs().await.unwrap().remove(0);
        // Slot 0 shifted by the 10:00 override lands at 10 AM.
        assert_eq!(
            moved.scheduled_time,
            chrono::NaiveTime::from_hms_opt(10, 0, 0)
        );
    }

    #[tokio::test]
    async fn test_move_records_undo() {
        let a = job(7, 1);
        let b = job(7, 2);
        let (store, mut controller) = controller_with(&[a.clone(), b.clone()]).await;

        let request = MoveRequest {
            job_id: b.id,
            target_date: date(8),
            target_index: 0,
        };
        controller
            .move_job(&request, &DayTimingOverrides::new())
            .await
            .unwrap();

        let undo = controller.undo_controller();
        assert!(undo.can_undo());
        match undo.undo(store.as_ref()).await.unwrap() {
            crate::schedule::UndoOutcome::Undone(restored) => {
                assert_eq!(restored.date, date(7));
                assert_eq!(restored.order, Some(2));
            }
            other => panic!("expected undo, got {:?}", other),
        }
    }
}
