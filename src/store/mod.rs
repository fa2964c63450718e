//! Persistence seams for jobs and customers.
//!
//! The engine never talks to a database directly. The host application
//! implements these traits over whatever store it uses; the engine assumes
//! eventual consistency and last-write-wins semantics. An in-memory
//! implementation ships for tests and offline use.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Customer, Job, NewJob};

mod memory;

pub use memory::{InMemoryCustomerStore, InMemoryJobStore};

/// Store of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Every job currently known to the store.
    async fn fetch_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Create a job.
    ///
    /// Fails with [`StoreError::DuplicateKey`] when a job already exists
    /// for the same `(customer_id, date)`.
    async fn add_job(&self, new: NewJob) -> Result<Job, StoreError>;

    /// Persist an updated job, replacing the stored record.
    async fn update_job(&self, job: &Job) -> Result<Job, StoreError>;
}

/// Store of customer records.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Every customer currently known to the store.
    async fn fetch_customers(&self) -> Result<Vec<Customer>, StoreError>;

    /// Persist an updated customer, replacing the stored record.
    async fn update_customer(&self, customer: &Customer) -> Result<Customer, StoreError>;
}
