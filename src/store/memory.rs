//! In-memory stores for tests and offline use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Customer, Job, JobStatus, NewJob};
use crate::store::{CustomerStore, JobStore};

/// In-memory job store honoring the `(customer_id, date)` uniqueness
/// constraint.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job directly, bypassing the duplicate check. Test setup only.
    pub async fn seed(&self, job: Job) {
        self.jobs.write().await.insert(job.id, job);
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn fetch_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.jobs.read().await.values().cloned().collect())
    }

    async fn add_job(&self, new: NewJob) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let duplicate = jobs
            .values()
            .any(|j| j.customer_id == new.customer_id && j.date == new.date);
        if duplicate {
            return Err(StoreError::DuplicateKey {
                customer_id: new.customer_id,
                date: new.date,
            });
        }

        let mut job = Job::new(new.customer_id, new.date);
        job.status = JobStatus::Scheduled;
        job.scheduled_time = new.scheduled_time;
        job.notes = new.notes;
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job(&self, job: &Job) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound {
                kind: "job",
                id: job.id,
            });
        }
        jobs.insert(job.id, job.clone());
        Ok(job.clone())
    }
}

/// In-memory customer store.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<HashMap<Uuid, Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer. Test setup only.
    pub async fn seed(&self, customer: Customer) {
        self.customers
            .write()
            .await
            .insert(customer.id, customer);
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn fetch_customers(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.customers.read().await.values().cloned().collect())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write().await;
        if !customers.contains_key(&customer.id) {
            return Err(StoreError::NotFound {
                kind: "customer",
                id: customer.id,
            });
        }
        customers.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }
}
