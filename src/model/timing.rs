//! Per-date working-window overrides.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default working-day start hour (24h).
pub const DEFAULT_DAY_START_HOUR: u8 = 5;
/// Default working-day end hour (24h).
pub const DEFAULT_DAY_END_HOUR: u8 = 18;

/// A single day's working window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTiming {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for DayTiming {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_DAY_START_HOUR,
            end_hour: DEFAULT_DAY_END_HOUR,
        }
    }
}

/// Explicit per-date overrides of the working window.
///
/// Owned by the caller and injected into the otherwise-pure slot and
/// suggestion functions; never a module-level singleton.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayTimingOverrides {
    entries: HashMap<NaiveDate, DayTiming>,
}

impl DayTimingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// The override for a date, if one was set.
    pub fn get(&self, date: NaiveDate) -> Option<DayTiming> {
        self.entries.get(&date).copied()
    }

    /// Set (or replace) a date's window.
    pub fn set(&mut self, date: NaiveDate, timing: DayTiming) {
        self.entries.insert(date, timing);
    }

    /// Drop a date's override, restoring the default window.
    pub fn remove(&mut self, date: NaiveDate) {
        self.entries.remove(&date);
    }

    /// Effective start hour for a date.
    pub fn start_for(&self, date: NaiveDate) -> u8 {
        self.get(date)
            .map(|t| t.start_hour)
            .unwrap_or(DEFAULT_DAY_START_HOUR)
    }

    /// Effective end hour for a date.
    pub fn end_for(&self, date: NaiveDate) -> u8 {
        self.get(date)
            .map(|t| t.end_hour)
            .unwrap_or(DEFAULT_DAY_END_HOUR)
    }
}
