//! Weather-driven schedule suggestions.
//!
//! The engine regenerates its suggestion set from the forecast, the job
//! list, and the timing overrides on every call; accepting a suggestion
//! mutates those inputs, so the next regeneration simply no longer
//! produces it. There is no suppression list to get out of sync.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::forecast::classifier::{DayClass, WeatherClassifier};
use crate::model::{
    DayTiming, DayTimingOverrides, Job, JobStatus, Severity, ShiftKind, Suggestion, WeatherDay,
};
use crate::schedule::slots;
use crate::store::JobStore;

/// Outcome of [`SuggestionEngine::accept_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptSummary {
    pub applied: usize,
    pub failed: usize,
}

/// A candidate target day for moved jobs.
#[derive(Debug, Clone, Copy)]
struct GoodDay {
    date: NaiveDate,
    workload: usize,
}

/// Generates and applies weather suggestions.
pub struct SuggestionEngine {
    config: EngineConfig,
    classifier: WeatherClassifier,
    jobs: Arc<dyn JobStore>,
    pending: Vec<Suggestion>,
}

impl SuggestionEngine {
    pub fn new(config: EngineConfig, jobs: Arc<dyn JobStore>) -> Self {
        let classifier = WeatherClassifier::new(config.clone());
        Self {
            config,
            classifier,
            jobs,
            pending: Vec::new(),
        }
    }

    /// Suggestions currently awaiting a decision.
    pub fn pending(&self) -> &[Suggestion] {
        &self.pending
    }

    /// Regenerate the suggestion set from current data.
    ///
    /// Deterministic: identical inputs produce an identical set, in the
    /// same order.
    pub fn generate(
        &mut self,
        forecast: &[WeatherDay],
        jobs: &[Job],
        overrides: &DayTimingOverrides,
    ) -> Vec<Suggestion> {
        self.pending = self.compute(forecast, jobs, overrides);
        self.pending.clone()
    }

    fn compute(
        &self,
        forecast: &[WeatherDay],
        jobs: &[Job],
        overrides: &DayTimingOverrides,
    ) -> Vec<Suggestion> {
        let window = &forecast[..forecast.len().min(self.config.forecast_days as usize)];
        if window.is_empty() {
            return Vec::new();
        }

        let by_date = scheduled_by_date(jobs);

        let classes: Vec<DayClass> = window
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let previous = if i > 0 { Some(&window[i - 1]) } else { None };
                self.classifier.classify(day, previous)
            })
            .collect();

        let good_days: Vec<GoodDay> = window
            .iter()
            .zip(&classes)
            .filter(|(_, class)| matches!(class, DayClass::Good))
            .map(|(day, _)| GoodDay {
                date: day.date,
                workload: by_date.get(&day.date).map(Vec::len).unwrap_or(0),
            })
            .collect();

        let empty = Vec::new();
        let mut out = Vec::new();

        for (day, class) in window.iter().zip(&classes) {
            let day_jobs = by_date.get(&day.date).unwrap_or(&empty);

            match *class {
                DayClass::Bad { severity } => {
                    if day_jobs.is_empty() {
                        continue;
                    }
                    let Some(target) = move_target(day.date, &good_days) else {
                        continue;
                    };
                    let wet_hours = day
                        .hourly
                        .iter()
                        .filter(|s| {
                            s.rain_mm > self.config.rain_threshold_mm || s.is_severe()
                        })
                        .count();
                    let reason = match severity {
                        Severity::Heavy => format!(
                            "Heavy rain across {} of {} forecast hours",
                            wet_hours,
                            day.hourly.len()
                        ),
                        Severity::Moderate => format!(
                            "Rain across {} of {} forecast hours",
                            wet_hours,
                            day.hourly.len()
                        ),
                    };
                    out.push(Suggestion::Move {
                        job_ids: day_jobs.iter().map(|j| j.id).collect(),
                        current_date: day.date,
                        suggested_date: target,
                        reason,
                        severity,
                    });
                }

                DayClass::Delay {
                    safe_start_hour,
                    previous_night_rain,
                } => {
                    let current_start = overrides.start_for(day.date);
                    if current_start < safe_start_hour {
                        let reason = if previous_night_rain {
                            format!(
                                "Wet grass from overnight rain; safe to start at {}:00",
                                safe_start_hour
                            )
                        } else {
                            format!(
                                "Morning rain clears; safe to start at {}:00",
                                safe_start_hour
                            )
                        };
                        out.push(Suggestion::AdjustTime {
                            date: day.date,
                            current_start,
                            suggested_start: safe_start_hour,
                            suggested_end: None,
                            reason,
                            kind: ShiftKind::Delay,
                        });
                    }

                    // Roughly one job per remaining workable hour; whatever
                    // does not fit moves to the least busy good day.
                    let capacity =
                        self.config.day_end_hour.saturating_sub(safe_start_hour) as usize;
                    self.push_overflow(&mut out, day.date, day_jobs, capacity, &good_days);
                }

                DayClass::StartEarly { last_good_hour } => {
                    if overrides.get(day.date).is_none() {
                        out.push(Suggestion::AdjustTime {
                            date: day.date,
                            current_start: overrides.start_for(day.date),
                            suggested_start: self.config.early_start_hour,
                            suggested_end: Some(last_good_hour),
                            reason: format!(
                                "Rain arrives in the evening; finish by {}:00",
                                last_good_hour
                            ),
                            kind: ShiftKind::StartEarly,
                        });
                    }

                    let capacity = last_good_hour.saturating_sub(self.config.day_start_hour) as usize;
                    self.push_overflow(&mut out, day.date, day_jobs, capacity, &good_days);
                }

                DayClass::Good | DayClass::Mixed | DayClass::Unclassified => {}
            }
        }

        out
    }

    /// Emit a move for the jobs past a shortened day's capacity.
    fn push_overflow(
        &self,
        out: &mut Vec<Suggestion>,
        date: NaiveDate,
        day_jobs: &[&Job],
        capacity: usize,
        good_days: &[GoodDay],
    ) {
        if day_jobs.len() <= capacity {
            return;
        }
        let Some(target) = least_busy(date, good_days) else {
            return;
        };
        let overflow: Vec<Uuid> = day_jobs[capacity..].iter().map(|j| j.id).collect();
        out.push(Suggestion::Move {
            job_ids: overflow,
            current_date: date,
            suggested_date: target,
            reason: format!("Only {} workable hours left in the day", capacity),
            severity: Severity::Moderate,
        });
    }

    /// Reschedule every job in a move suggestion to `target_date`.
    ///
    /// Per-job persistence failures are logged and skipped; the move is
    /// fire-and-forget against a last-write-wins store. Returns the number
    /// of jobs rescheduled.
    pub async fn accept_move(
        &mut self,
        suggestion: &Suggestion,
        target_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let Suggestion::Move { job_ids, .. } = suggestion else {
            return Ok(0);
        };
        let moved = self.apply_move(job_ids, target_date).await?;
        self.pending.retain(|s| s != suggestion);
        Ok(moved)
    }

    async fn apply_move(
        &self,
        job_ids: &[Uuid],
        target_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let jobs = self.jobs.fetch_jobs().await?;
        let mut moved = 0;
        for job in jobs.iter().filter(|j| job_ids.contains(&j.id)) {
            let mut updated = job.clone();
            updated.date = target_date;
            updated.order = None;
            updated.scheduled_time = None;
            match self.jobs.update_job(&updated).await {
                Ok(_) => moved += 1,
                Err(e) => {
                    tracing::warn!("Failed to reschedule job {}: {}", job.id, e);
                }
            }
        }
        Ok(moved)
    }

    /// Apply a start-time suggestion by writing the day's timing override.
    pub fn accept_start_time(
        &mut self,
        date: NaiveDate,
        new_start: u8,
        new_end: Option<u8>,
        overrides: &mut DayTimingOverrides,
    ) {
        let end_hour = new_end.unwrap_or_else(|| overrides.end_for(date));
        overrides.set(
            date,
            DayTiming {
                start_hour: new_start,
                end_hour,
            },
        );
        self.pending
            .retain(|s| !(matches!(s, Suggestion::AdjustTime { .. }) && s.date() == date));
    }

    /// Apply every pending suggestion in order.
    ///
    /// Not transactional: a failure on one suggestion does not block the
    /// rest.
    pub async fn accept_all(&mut self, overrides: &mut DayTimingOverrides) -> AcceptSummary {
        let pending = std::mem::take(&mut self.pending);
        let mut summary = AcceptSummary::default();

        for suggestion in pending {
            match suggestion {
                Suggestion::Move {
                    ref job_ids,
                    suggested_date,
                    ..
                } => match self.apply_move(job_ids, suggested_date).await {
                    Ok(_) => summary.applied += 1,
                    Err(e) => {
                        tracing::warn!("Skipping move suggestion: {}", e);
                        summary.failed += 1;
                    }
                },
                Suggestion::AdjustTime {
                    date,
                    suggested_start,
                    suggested_end,
                    ..
                } => {
                    let end_hour = suggested_end.unwrap_or_else(|| overrides.end_for(date));
                    overrides.set(
                        date,
                        DayTiming {
                            start_hour: suggested_start,
                            end_hour,
                        },
                    );
                    summary.applied += 1;
                }
            }
        }

        summary
    }
}

/// Scheduled jobs grouped by date, each day in route order.
fn scheduled_by_date(jobs: &[Job]) -> HashMap<NaiveDate, Vec<&Job>> {
    let mut by_date: HashMap<NaiveDate, Vec<&Job>> = HashMap::new();
    for job in jobs.iter().filter(|j| j.status == JobStatus::Scheduled) {
        by_date.entry(job.date).or_default().push(job);
    }
    for day_jobs in by_date.values_mut() {
        day_jobs.sort_by(|a, b| slots::route_cmp(a, b));
    }
    by_date
}

/// Target day for a whole-day move: future good days first, Friday and
/// Saturday preferred among them, lowest workload winning ties, earliest
/// date as the final tie-break.
fn move_target(from: NaiveDate, good_days: &[GoodDay]) -> Option<NaiveDate> {
    let future: Vec<GoodDay> = good_days.iter().filter(|g| g.date > from).copied().collect();
    let pool = if future.is_empty() {
        good_days
            .iter()
            .filter(|g| g.date != from)
            .copied()
            .collect()
    } else {
        future
    };

    let weekend: Vec<GoodDay> = pool
        .iter()
        .filter(|g| matches!(g.date.weekday(), Weekday::Fri | Weekday::Sat))
        .copied()
        .collect();

    let candidates = if weekend.is_empty() { &pool } else { &weekend };
    candidates
        .iter()
        .min_by_key(|g| (g.workload, g.date))
        .map(|g| g.date)
}

/// Least busy good day other than `exclude`.
fn least_busy(exclude: NaiveDate, good_days: &[GoodDay]) -> Option<NaiveDate> {
    good_days
        .iter()
        .filter(|g| g.date != exclude)
        .min_by_key(|g| (g.workload, g.date))
        .map(|g| g.date)
}
