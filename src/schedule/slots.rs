//! Hourly slot assignment for a day's jobs.
//!
//! Pure and stateless: slot numbers are derived from `order` and
//! `scheduled_time` on every call and never persisted. Recompute after
//! every reorder, optimization, or timing-override change.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveTime;
use uuid::Uuid;

use crate::model::{DEFAULT_DAY_START_HOUR, Job, JobStatus};

/// Hourly slots in the default 5am-6pm working day.
pub const SLOT_COUNT: usize = 14;

/// Route order within a day: explicit `order` first (unordered last), then
/// `scheduled_time` (untimed last). Stable sort keeps insertion order for
/// full ties.
pub fn route_cmp(a: &Job, b: &Job) -> Ordering {
    let key = |j: &Job| {
        (
            j.order.is_none(),
            j.order.unwrap_or(0),
            j.scheduled_time.is_none(),
            j.scheduled_time,
        )
    };
    key(a).cmp(&key(b))
}

/// Sort key for display: completed jobs sink below active ones, then route
/// order applies.
pub fn display_cmp(a: &Job, b: &Job) -> Ordering {
    let completed = |j: &Job| j.status == JobStatus::Completed;
    completed(a)
        .cmp(&completed(b))
        .then_with(|| route_cmp(a, b))
}

/// Assign each job an hourly slot index in `[0, SLOT_COUNT)`.
///
/// A start override later than the default start shifts every slot down
/// the day; slots clamp at the end of the window rather than overflow.
pub fn assign_slots(jobs: &[Job], start_override: u8) -> HashMap<Uuid, usize> {
    let shift = start_override.saturating_sub(DEFAULT_DAY_START_HOUR) as usize;

    let mut sorted: Vec<&Job> = jobs.iter().collect();
    sorted.sort_by(|a, b| display_cmp(a, b));

    sorted
        .iter()
        .enumerate()
        .map(|(position, job)| (job.id, (position + shift).min(SLOT_COUNT - 1)))
        .collect()
}

/// Display label for a slot, 12-hour clock ("5 AM", "1 PM").
///
/// Slots already carry any late-start shift, so the epoch is the default
/// day start; an override earlier than that moves the epoch down with it.
pub fn label_for(slot_index: usize, start_override: u8) -> String {
    let epoch = start_override.min(DEFAULT_DAY_START_HOUR);
    let hour24 = (epoch as usize + slot_index).min(23);

    let (hour12, meridiem) = match hour24 {
        0 => (12, "AM"),
        1..=11 => (hour24, "AM"),
        12 => (12, "PM"),
        _ => (hour24 - 12, "PM"),
    };
    format!("{} {}", hour12, meridiem)
}

/// The wall-clock time a slot represents, for deriving `scheduled_time`.
pub fn time_for_slot(slot_index: usize, start_override: u8) -> NaiveTime {
    let epoch = start_override.min(DEFAULT_DAY_START_HOUR);
    let hour24 = ((epoch as usize + slot_index).min(23)) as u32;
    NaiveTime::from_hms_opt(hour24, 0, 0).unwrap_or(NaiveTime::MIN)
}
