//! Job lifecycle: idempotent auto-creation, start, and completion.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::model::{Job, JobStatus, NewJob};
use crate::store::{CustomerStore, JobStore};

/// Outcome of one auto-creation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureSummary {
    pub created: usize,
    /// Jobs that already existed (or were raced by a concurrent sweep).
    pub duplicates: usize,
    pub failed: usize,
}

/// Creates and advances jobs as customers enter the visible horizon.
pub struct JobPlanner {
    config: EngineConfig,
    jobs: Arc<dyn JobStore>,
    customers: Arc<dyn CustomerStore>,
    /// Keys submitted but not yet visible in the store. Guards concurrent
    /// sweeps until the store's uniqueness constraint can take over.
    in_flight: Mutex<HashSet<(Uuid, NaiveDate)>>,
}

impl JobPlanner {
    pub fn new(
        config: EngineConfig,
        jobs: Arc<dyn JobStore>,
        customers: Arc<dyn CustomerStore>,
    ) -> Self {
        Self {
            config,
            jobs,
            customers,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Ensure a job exists for every customer whose next cut date falls
    /// within the horizon. Idempotent and safe to call concurrently:
    /// duplicate submissions are fenced by the in-flight set, and
    /// duplicate-key responses from the store are benign.
    pub async fn ensure_jobs(&self, today: NaiveDate) -> Result<EnsureSummary, StoreError> {
        let customers = self.customers.fetch_customers().await?;
        let existing = self.jobs.fetch_jobs().await?;
        let horizon_end = today
            .checked_add_days(Days::new(self.config.horizon_days as u64))
            .unwrap_or(today);

        let mut summary = EnsureSummary::default();

        for customer in customers {
            let Some(next) = customer.next_cut_date else {
                continue;
            };
            if next < today || next > horizon_end {
                continue;
            }
            if existing
                .iter()
                .any(|j| j.customer_id == customer.id && j.date == next)
            {
                continue;
            }

            let key = (customer.id, next);
            {
                let mut in_flight = self.in_flight.lock().await;
                if !in_flight.insert(key) {
                    summary.duplicates += 1;
                    continue;
                }
            }

            let result = self
                .jobs
                .add_job(NewJob {
                    customer_id: customer.id,
                    date: next,
                    scheduled_time: None,
                    notes: None,
                })
                .await;

            self.in_flight.lock().await.remove(&key);

            match result {
                Ok(_) => summary.created += 1,
                Err(e) if e.is_duplicate() => {
                    tracing::debug!(
                        "Job for customer {} on {} already exists",
                        customer.id,
                        next
                    );
                    summary.duplicates += 1;
                }
                Err(e) => {
                    tracing::warn!("Auto-creation failed for customer {}: {}", customer.id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Mark a job in progress, stamping the start time.
    pub async fn start_job(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<Job, StoreError> {
        let mut job = self.find_job(job_id).await?;
        job.status = JobStatus::InProgress;
        job.start_time = Some(now);
        self.jobs.update_job(&job).await
    }

    /// Complete a job: stamp the end time, advance the customer's cycle,
    /// and create the follow-on job for the next cut date if absent.
    pub async fn complete_job(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<Job, StoreError> {
        let mut job = self.find_job(job_id).await?;
        job.status = JobStatus::Completed;
        job.end_time = Some(now);
        if let Some(started) = job.start_time {
            job.total_minutes = Some((now - started).num_minutes().max(0));
        }
        let completed = self.jobs.update_job(&job).await?;

        let customers = self.customers.fetch_customers().await?;
        if let Some(customer) = customers.into_iter().find(|c| c.id == job.customer_id) {
            let next = customer.frequency.advance(job.date);

            let mut updated = customer;
            updated.last_cut_date = Some(job.date);
            updated.next_cut_date = Some(next);
            if let Err(e) = self.customers.update_customer(&updated).await {
                tracing::warn!("Failed to advance customer {}: {}", updated.id, e);
            }

            match self
                .jobs
                .add_job(NewJob {
                    customer_id: updated.id,
                    date: next,
                    scheduled_time: None,
                    notes: None,
                })
                .await
            {
                Ok(_) | Err(StoreError::DuplicateKey { .. }) => {}
                Err(e) => {
                    tracing::warn!("Failed to create follow-on job: {}", e);
                }
            }
        }

        Ok(completed)
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .fetch_jobs()
            .await?
            .into_iter()
            .find(|j| j.id == job_id)
            .ok_or(StoreError::NotFound {
                kind: "job",
                id: job_id,
            })
    }
}
