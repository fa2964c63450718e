//! Schedule-change suggestions surfaced to the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How hard a bad day is expected to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Heavy,
}

/// Which direction a working window shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShiftKind {
    /// Push the day's start later (morning rain, wet grass).
    Delay,
    /// Pull the day earlier and finish before evening rain.
    StartEarly,
}

/// A proposed schedule change.
///
/// Suggestions are always derived from the current forecast and job data;
/// accepting one mutates the underlying records, and the next regeneration
/// simply no longer produces it. The engine keeps no suppression list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Suggestion {
    /// Move every listed job off a bad day. One suggestion covers the whole
    /// day, not one per job.
    Move {
        job_ids: Vec<Uuid>,
        current_date: NaiveDate,
        suggested_date: NaiveDate,
        reason: String,
        severity: Severity,
    },
    /// Shift a day's working window instead of moving its jobs.
    AdjustTime {
        date: NaiveDate,
        /// Start hour currently in effect for the day.
        current_start: u8,
        suggested_start: u8,
        /// Only set for start-early shifts; the hour work must stop by.
        suggested_end: Option<u8>,
        reason: String,
        kind: ShiftKind,
    },
}

impl Suggestion {
    /// The date this suggestion acts on.
    pub fn date(&self) -> NaiveDate {
        match self {
            Suggestion::Move { current_date, .. } => *current_date,
            Suggestion::AdjustTime { date, .. } => *date,
        }
    }
}
