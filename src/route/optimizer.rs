//! Rolling multi-day route optimization.
//!
//! For each day in the horizon the external optimizer proposes a visiting
//! order; the orchestrator derives `order` and `scheduled_time`, persists
//! every touched job individually, and captures a snapshot of the result
//! for drift detection. Failures are isolated per day and per job; a
//! request-generation counter keeps a stale pass from overwriting a newer
//! one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Days, NaiveDate, NaiveTime};
use futures::StreamExt;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{OptimizeError, RouteError};
use crate::model::{DayTimingOverrides, Job, JobStatus};
use crate::provider::{RouteProvider, RouteStop};
use crate::route::DriveTimeEstimator;
use crate::schedule::slots;
use crate::store::{CustomerStore, JobStore};

/// Where the orchestrator is in its lifecycle.
///
/// `Idle -> Optimizing -> Optimized`, back to `Idle` when drift is
/// detected or a pass fails outright. There is no partial "optimized"
/// state on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeState {
    Idle,
    Optimizing,
    Optimized,
}

/// Aggregate result of a full pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeSummary {
    /// Days the external optimizer re-sequenced.
    pub days_optimized: usize,
    /// Days whose optimizer call failed and were left untouched.
    pub days_failed: usize,
    pub jobs_persisted: usize,
    pub jobs_failed: usize,
}

/// What a single day's planning produced.
enum DayOutcome {
    /// Nothing on the day needed writing.
    Untouched,
    /// New records to persist; `optimized` marks an external-optimizer day.
    Planned { updated: Vec<Job>, optimized: bool },
    Failed { date: NaiveDate, error: RouteError },
}

/// Orchestrates the rolling optimization pass and tracks drift against the
/// last optimized snapshot.
pub struct RouteOptimizationOrchestrator {
    config: EngineConfig,
    jobs: Arc<dyn JobStore>,
    customers: Arc<dyn CustomerStore>,
    provider: Arc<dyn RouteProvider>,
    drive_times: Arc<DriveTimeEstimator>,
    state: Mutex<OptimizeState>,
    /// Bumped on every optimize request; a pass whose generation is no
    /// longer current must not write.
    generation: AtomicU64,
    snapshot: Mutex<HashMap<Uuid, i32>>,
    changes_tx: watch::Sender<bool>,
    changes_rx: watch::Receiver<bool>,
}

impl RouteOptimizationOrchestrator {
    pub fn new(
        config: EngineConfig,
        jobs: Arc<dyn JobStore>,
        customers: Arc<dyn CustomerStore>,
        provider: Arc<dyn RouteProvider>,
        drive_times: Arc<DriveTimeEstimator>,
    ) -> Self {
        let (changes_tx, changes_rx) = watch::channel(false);
        Self {
            config,
            jobs,
            customers,
            provider,
            drive_times,
            state: Mutex::new(OptimizeState::Idle),
            generation: AtomicU64::new(0),
            snapshot: Mutex::new(HashMap::new()),
            changes_tx,
            changes_rx,
        }
    }

    pub async fn state(&self) -> OptimizeState {
        *self.state.lock().await
    }

    /// Receiver for the has-changes signal: `true` after drift is
    /// detected, `false` again after a successful pass.
    pub fn changes(&self) -> watch::Receiver<bool> {
        self.changes_rx.clone()
    }

    /// Run a full pass over the horizon starting at `today`.
    pub async fn optimize_all(
        &self,
        starting_address: &str,
        overrides: &DayTimingOverrides,
        today: NaiveDate,
    ) -> Result<OptimizeSummary, OptimizeError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock().await = OptimizeState::Optimizing;

        // Stale pairs must not leak into the new routes.
        self.drive_times.clear().await;

        let all_jobs = match self.jobs.fetch_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                self.fail_if_current(generation).await;
                return Err(e.into());
            }
        };
        let customers = match self.customers.fetch_customers().await {
            Ok(customers) => customers,
            Err(e) => {
                self.fail_if_current(generation).await;
                return Err(e.into());
            }
        };
        let address_of: HashMap<Uuid, String> = customers
            .into_iter()
            .map(|c| (c.id, c.address))
            .collect();

        let days: Vec<NaiveDate> = (0..self.config.horizon_days)
            .filter_map(|i| today.checked_add_days(Days::new(i as u64)))
            .collect();

        // Per-day planning is independent; renumbering for a day happens
        // inside its own future, strictly after that day's response.
        let outcomes: Vec<DayOutcome> = futures::stream::iter(
            days.into_iter()
                .map(|date| self.plan_day(date, &all_jobs, &address_of, starting_address, overrides)),
        )
        .buffer_unordered(self.config.optimize_parallelism.max(1))
        .collect()
        .await;

        let mut summary = OptimizeSummary::default();
        let mut final_orders: HashMap<Uuid, i32> = all_jobs
            .iter()
            .filter_map(|j| j.order.map(|o| (j.id, o)))
            .collect();

        for outcome in outcomes {
            if self.generation.load(Ordering::SeqCst) != generation {
                return Err(OptimizeError::Superseded);
            }
            match outcome {
                DayOutcome::Untouched => {}
                DayOutcome::Failed { date, error } => {
                    tracing::warn!("Optimization failed for {}: {}", date, error);
                    summary.days_failed += 1;
                }
                DayOutcome::Planned { updated, optimized } => {
                    if optimized {
                        summary.days_optimized += 1;
                    }
                    for job in updated {
                        match self.jobs.update_job(&job).await {
                            Ok(_) => {
                                summary.jobs_persisted += 1;
                                if let Some(order) = job.order {
                                    final_orders.insert(job.id, order);
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to persist job {}: {}", job.id, e);
                                summary.jobs_failed += 1;
                            }
                        }
                    }
                }
            }
        }

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(OptimizeError::Superseded);
        }

        *self.snapshot.lock().await = final_orders;
        *self.state.lock().await = OptimizeState::Optimized;
        let _ = self.changes_tx.send(false);

        tracing::info!(
            "Optimization pass complete: {} days optimized, {} failed, {} jobs persisted",
            summary.days_optimized,
            summary.days_failed,
            summary.jobs_persisted
        );
        Ok(summary)
    }

    /// Plan one day. Days with fewer than two schedulable jobs skip the
    /// external optimizer entirely; unordered jobs are appended after the
    /// day's current max order either way.
    async fn plan_day(
        &self,
        date: NaiveDate,
        all_jobs: &[Job],
        address_of: &HashMap<Uuid, String>,
        origin: &str,
        overrides: &DayTimingOverrides,
    ) -> DayOutcome {
        let mut day: Vec<&Job> = all_jobs.iter().filter(|j| j.date == date).collect();
        if day.is_empty() {
            return DayOutcome::Untouched;
        }
        day.sort_by(|a, b| slots::display_cmp(a, b));

        let scheduled: Vec<&Job> = day
            .iter()
            .copied()
            .filter(|j| j.status == JobStatus::Scheduled)
            .collect();

        if scheduled.len() < 2 {
            let updated = append_unordered(&day);
            if updated.is_empty() {
                return DayOutcome::Untouched;
            }
            return DayOutcome::Planned {
                updated,
                optimized: false,
            };
        }

        let stops: Vec<RouteStop> = scheduled
            .iter()
            .filter_map(|j| {
                address_of.get(&j.customer_id).map(|address| RouteStop {
                    id: j.id,
                    address: address.clone(),
                    order: j.order,
                })
            })
            .collect();
        if stops.len() < 2 {
            return DayOutcome::Untouched;
        }

        let route = match self.provider.optimize_route(origin, &stops).await {
            Ok(route) => route,
            Err(error) => return DayOutcome::Failed { date, error },
        };

        // Walk the visiting order from the day's start: each stop is one
        // service block plus the drive to the next.
        let mut updated = Vec::with_capacity(route.stop_ids.len());
        let mut clock_minutes = overrides.start_for(date) as u32 * 60;

        for (position, stop_id) in route.stop_ids.iter().enumerate() {
            let Some(job) = scheduled.iter().find(|j| j.id == *stop_id) else {
                continue;
            };
            let mut next = (*job).clone();
            next.order = Some(position as i32 + 1);
            next.scheduled_time = minutes_to_time(clock_minutes);
            next.drive_minutes = route
                .segments
                .get(position)
                .and_then(|s| s.duration_minutes)
                .map(i64::from);
            updated.push(next);

            let leg = route
                .segments
                .get(position + 1)
                .and_then(|s| s.duration_minutes)
                .unwrap_or(self.config.fallback_leg_minutes);
            clock_minutes += self.config.service_minutes + leg;
        }

        // Non-scheduled jobs keep their place; anything unordered lands
        // after the new sequence.
        let mut max_order = updated.len() as i32;
        for job in day
            .iter()
            .filter(|j| j.status != JobStatus::Scheduled && j.order.is_none())
        {
            max_order += 1;
            let mut next = (*job).clone();
            next.order = Some(max_order);
            updated.push(next);
        }

        DayOutcome::Planned {
            updated,
            optimized: true,
        }
    }

    async fn fail_if_current(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            *self.state.lock().await = OptimizeState::Idle;
        }
    }

    /// Diff the current job collection against the optimized snapshot.
    ///
    /// Any mismatch flips `Optimized -> Idle` and raises the has-changes
    /// signal so the caller can re-enable manual optimization. Returns
    /// whether drift was detected.
    pub async fn note_jobs_changed(&self, jobs: &[Job]) -> bool {
        {
            let state = self.state.lock().await;
            if *state != OptimizeState::Optimized {
                return false;
            }
        }

        let current: HashMap<Uuid, i32> = jobs
            .iter()
            .filter_map(|j| j.order.map(|o| (j.id, o)))
            .collect();
        let drifted = *self.snapshot.lock().await != current;

        if drifted {
            *self.state.lock().await = OptimizeState::Idle;
            let _ = self.changes_tx.send(true);
            tracing::debug!("Job collection drifted from the optimized snapshot");
        }
        drifted
    }
}

fn minutes_to_time(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt((minutes / 60).min(23), minutes % 60, 0)
}

/// Orders for a day's unordered jobs, appended after the current max.
fn append_unordered(day: &[&Job]) -> Vec<Job> {
    let mut max_order = day.iter().filter_map(|j| j.order).max().unwrap_or(0);
    let mut updated = Vec::new();
    for job in day.iter().filter(|j| j.order.is_none()) {
        max_order += 1;
        let mut next = (*job).clone();
        next.order = Some(max_order);
        updated.push(next);
    }
    updated
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::model::{Customer, Frequency};
    use crate::provider::{DriveTime, OptimizedRoute, RouteSegment};
    use crate::store::{InMemoryCustomerStore, InMemoryJobStore};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    /// Visits stops in reverse submission order with fixed 10-minute legs.
    struct ReversingOptimizer {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        gated_once: AtomicUsize,
    }

    impl ReversingOptimizer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                gated_once: AtomicUsize::new(0),
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Some(gate),
                gated_once: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RouteProvider for ReversingOptimizer {
        async fn drive_time(
            &self,
            _from: &str,
            _to: &str,
        ) -> Result<Option<DriveTime>, RouteError> {
            Ok(None)
        }

        async fn optimize_route(
            &self,
            origin: &str,
            stops: &[RouteStop],
        ) -> Result<OptimizedRoute, RouteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate
                && self.gated_once.fetch_add(1, Ordering::SeqCst) == 0
            {
                gate.notified().await;
            }

            let visited: Vec<&RouteStop> = stops.iter().rev().collect();
            let mut addresses = vec![origin.to_string()];
            addresses.extend(visited.iter().map(|s| s.address.clone()));

            Ok(OptimizedRoute {
                stop_ids: visited.iter().map(|s| s.id).collect(),
                segments: addresses
                    .windows(2)
                    .map(|pair| RouteSegment {
                        from_address: pair[0].clone(),
                        to_address: pair[1].clone(),
                        duration_minutes: Some(10),
                        duration_text: Some("10 min".to_string()),
                    })
                    .collect(),
                total_minutes: 10 * visited.len() as u32,
            })
        }
    }

    struct Fixture {
        jobs: Arc<InMemoryJobStore>,
        customers: Arc<InMemoryCustomerStore>,
        provider: Arc<ReversingOptimizer>,
        orchestrator: Arc<RouteOptimizationOrchestrator>,
    }

    fn fixture(provider: ReversingOptimizer) -> Fixture {
        let jobs = Arc::new(InMemoryJobStore::new());
        let customers = Arc::new(InMemoryCustomerStore::new());
        let provider = Arc::new(provider);
        let drive_times = Arc::new(DriveTimeEstimator::new(provider.clone() as Arc<dyn RouteProvider>));
        let orchestrator = Arc::new(RouteOptimizationOrchestrator::new(
            EngineConfig::default(),
            jobs.clone() as Arc<dyn JobStore>,
            customers.clone() as Arc<dyn CustomerStore>,
            provider.clone() as Arc<dyn RouteProvider>,
            drive_times,
        ));
        Fixture {
            jobs,
            customers,
            provider,
            orchestrator,
        }
    }

    async fn seed_customer_job(fx: &Fixture, d: u32, address: &str, order: i32) -> Job {
        let customer = Customer::new("c", address, Frequency::Weekly);
        let mut job = Job::new(customer.id, date(d));
        job.order = Some(order);
        fx.customers.seed(customer).await;
        fx.jobs.seed(job.clone()).await;
        job
    }

    #[tokio::test]
    async fn test_multi_job_day_is_resequenced_with_times() {
        let fx = fixture(ReversingOptimizer::new());
        let first = seed_customer_job(&fx, 7, "100 Oak Lane", 1).await;
        let second = seed_customer_job(&fx, 7, "200 Elm Street", 2).await;

        let summary = fx
            .orchestrator
            .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
            .await
            .unwrap();
        assert_eq!(summary.days_optimized, 1);
        assert_eq!(summary.jobs_persisted, 2);
        assert_eq!(fx.orchestrator.state().await, OptimizeState::Optimized);

        // The reversing optimizer visits the second stop first.
        let stored = fx.jobs.fetch_jobs().await.unwrap();
        let a = stored.iter().find(|j| j.id == second.id).unwrap();
        let b = stored.iter().find(|j| j.id == first.id).unwrap();
        assert_eq!(a.order, Some(1));
        assert_eq!(b.order, Some(2));

        // First stop at 5:00; next at 5:00 + 60 service + 10 drive.
        assert_eq!(a.scheduled_time, NaiveTime::from_hms_opt(5, 0, 0));
        assert_eq!(b.scheduled_time, NaiveTime::from_hms_opt(6, 10, 0));
        assert_eq!(a.drive_minutes, Some(10));
    }

    #[tokio::test]
    async fn test_single_job_day_skips_the_optimizer() {
        let fx = fixture(ReversingOptimizer::new());
        let only = seed_customer_job(&fx, 7, "100 Oak Lane", 1).await;

        let summary = fx
            .orchestrator
            .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
            .await
            .unwrap();

        assert_eq!(fx.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(summary.days_optimized, 0);

        let stored = fx.jobs.fetch_jobs().await.unwrap().remove(0);
        assert_eq!(stored, only);
    }

    #[tokio::test]
    async fn test_unordered_jobs_append_after_max_order() {
        let fx = fixture(ReversingOptimizer::new());
        seed_customer_job(&fx, 7, "100 Oak Lane", 3).await;
        let customer = Customer::new("c2", "300 Pine Road", Frequency::Weekly);
        let mut unordered = Job::new(customer.id, date(7));
        unordered.status = JobStatus::Completed;
        fx.customers.seed(customer).await;
        fx.jobs.seed(unordered.clone()).await;

        fx.orchestrator
            .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
            .await
            .unwrap();

        let stored = fx.jobs.fetch_jobs().await.unwrap();
        let appended = stored.iter().find(|j| j.id == unordered.id).unwrap();
        assert_eq!(appended.order, Some(4));
    }

    #[tokio::test]
    async fn test_day_start_override_shifts_times() {
        let fx = fixture(ReversingOptimizer::new());
        seed_customer_job(&fx, 7, "100 Oak Lane", 1).await;
        seed_customer_job(&fx, 7, "200 Elm Street", 2).await;

        let mut overrides = DayTimingOverrides::new();
        overrides.set(
            date(7),
            crate::model::DayTiming {
                start_hour: 10,
                end_hour: 18,
            },
        );

        fx.orchestrator
            .optimize_all("1 Depot Way", &overrides, date(7))
            .await
            .unwrap();

        let stored = fx.jobs.fetch_jobs().await.unwrap();
        let first_time = stored
            .iter()
            .find(|j| j.order == Some(1))
            .and_then(|j| j.scheduled_time);
        assert_eq!(first_time, NaiveTime::from_hms_opt(10, 0, 0));
    }

    #[tokio::test]
    async fn test_drift_detection_flips_state_and_signals() {
        let fx = fixture(ReversingOptimizer::new());
        seed_customer_job(&fx, 7, "100 Oak Lane", 1).await;
        seed_customer_job(&fx, 7, "200 Elm Street", 2).await;

        fx.orchestrator
            .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
            .await
            .unwrap();
        let mut changes = fx.orchestrator.changes();
        assert!(!*changes.borrow_and_update());

        // Unchanged collection: no drift.
        let jobs = fx.jobs.fetch_jobs().await.unwrap();
        assert!(!fx.orchestrator.note_jobs_changed(&jobs).await);

        // A manual edit drifts the orders.
        let mut edited = jobs.clone();
        edited[0].order = Some(99);
        assert!(fx.orchestrator.note_jobs_changed(&edited).await);
        assert_eq!(fx.orchestrator.state().await, OptimizeState::Idle);
        assert!(*changes.borrow_and_update());

        // Already idle: further edits are not drift.
        assert!(!fx.orchestrator.note_jobs_changed(&edited).await);
    }

    #[tokio::test]
    async fn test_stale_pass_is_superseded() {
        let gate = Arc::new(Notify::new());
        let fx = fixture(ReversingOptimizer::gated(gate.clone()));
        seed_customer_job(&fx, 7, "100 Oak Lane", 1).await;
        seed_customer_job(&fx, 7, "200 Elm Street", 2).await;

        // First pass parks inside its optimizer call.
        let orchestrator = fx.orchestrator.clone();
        let stale = tokio::spawn(async move {
            orchestrator
                .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
                .await
        });
        tokio::task::yield_now().await;

        // A newer pass runs to completion, then releases the first.
        fx.orchestrator
            .optimize_all("1 Depot Way", &DayTimingOverrides::new(), date(7))
            .await
            .unwrap();
        gate.notify_waiters();

        let result = stale.await.unwrap();
        assert!(matches!(result, Err(OptimizeError::Superseded)));
        // The newer pass owns the state.
        assert_eq!(fx.orchestrator.state().await, OptimizeState::Optimized);
    }
}
