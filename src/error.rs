//! Error types for the scheduling engine.

use chrono::NaiveDate;
use uuid::Uuid;

/// Errors from the job and customer stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A job already exists for this customer and date.
    ///
    /// Benign during idempotent auto-creation; callers there suppress it.
    #[error("duplicate job for customer {customer_id} on {date}")]
    DuplicateKey { customer_id: Uuid, date: NaiveDate },

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// The backing store failed.
    #[error("store backend error: {reason}")]
    Backend { reason: String },
}

impl StoreError {
    /// Whether this is the benign duplicate-key case.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Errors from the weather provider.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The forecast or geocoding request failed in transit.
    #[error("weather request failed: {reason}")]
    RequestFailed { reason: String },

    /// The service answered with something we could not use.
    #[error("invalid weather response: {reason}")]
    InvalidResponse { reason: String },
}

/// Errors from the route/distance provider.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The routing request failed in transit.
    #[error("route request failed: {reason}")]
    RequestFailed { reason: String },

    /// The service answered with something we could not use.
    #[error("invalid route response: {reason}")]
    InvalidResponse { reason: String },

    /// The optimizer returned no usable visiting order.
    #[error("optimizer returned no usable visiting order")]
    EmptyRoute,
}

/// Errors from a full route-optimization pass.
///
/// Per-day optimizer failures and per-job persistence failures are not
/// errors at this level; they are isolated and reported in the pass summary.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    /// A newer optimize request superseded this pass mid-flight.
    #[error("optimization pass superseded by a newer request")]
    Superseded,

    /// The store could not be read at the start of the pass.
    #[error(transparent)]
    Store(#[from] StoreError),
}
