//! Job records and scheduling status.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

/// A single visit on the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Calendar day the job is scheduled for. Local, no timezone.
    pub date: NaiveDate,
    pub status: JobStatus,
    /// Position within the day's route. `None` means unordered; unordered
    /// jobs sort after every ordered job.
    pub order: Option<i32>,
    /// Planned arrival time, 24h.
    pub scheduled_time: Option<NaiveTime>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_minutes: Option<i64>,
    pub drive_minutes: Option<i64>,
    pub notes: Option<String>,
}

impl Job {
    /// Create a freshly scheduled job with no order or timing yet.
    pub fn new(customer_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            date,
            status: JobStatus::Scheduled,
            order: None,
            scheduled_time: None,
            start_time: None,
            end_time: None,
            total_minutes: None,
            drive_minutes: None,
            notes: None,
        }
    }

    /// Minutes elapsed since the job was started.
    ///
    /// Always derived from the stored start timestamp, never accumulated,
    /// so repeated calls stay correct across restarts.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.start_time.map(|started| (now - started).num_minutes().max(0))
    }

    /// The planned arrival rendered as "H:MM" 24h, the store's wire format.
    pub fn scheduled_time_label(&self) -> Option<String> {
        self.scheduled_time
            .map(|t| t.format("%-H:%M").to_string())
    }
}

/// Fields required to create a job. The store fills in everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub customer_id: Uuid,
    pub date: NaiveDate,
    pub scheduled_time: Option<NaiveTime>,
    pub notes: Option<String>,
}
