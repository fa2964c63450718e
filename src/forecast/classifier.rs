//! Pure classification of a forecast day.

use crate::config::EngineConfig;
use crate::model::{Severity, WeatherDay};

/// Latest hour a delayed start may be pushed to.
const MAX_DELAYED_START_HOUR: u8 = 17;

/// Classification of a single forecast day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayClass {
    /// No hourly data; treated as neither bad nor good.
    Unclassified,
    /// Most of the day is unworkable.
    Bad { severity: Severity },
    /// Workable all day.
    Good,
    /// Morning is lost; start once it clears.
    Delay {
        safe_start_hour: u8,
        /// Set when the delay comes from overnight rain (wet grass), not
        /// the day's own forecast.
        previous_night_rain: bool,
    },
    /// Evening rain; start early and finish before it arrives.
    StartEarly { last_good_hour: u8 },
    /// Rain scattered through the day with no clean edge to work around.
    Mixed,
}

/// Classifies forecast days. Pure: no state, never errors.
#[derive(Debug, Clone)]
pub struct WeatherClassifier {
    config: EngineConfig,
}

impl WeatherClassifier {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Classify `day`, consulting `previous` for the overnight-rain rule.
    pub fn classify(&self, day: &WeatherDay, previous: Option<&WeatherDay>) -> DayClass {
        if day.hourly.is_empty() {
            return DayClass::Unclassified;
        }

        let total = day.hourly.len();
        let bad = day.hourly.iter().filter(|s| self.sample_is_bad(s)).count();

        if bad as f64 / total as f64 >= self.config.classify_threshold {
            return DayClass::Bad {
                severity: self.severity(day),
            };
        }

        // Heavy rain late the previous evening leaves the grass wet well
        // into the morning even when today's forecast is clear.
        if self.previous_night_was_wet(previous) {
            return DayClass::Delay {
                safe_start_hour: self.config.wet_grass_start_hour,
                previous_night_rain: true,
            };
        }

        if (total - bad) as f64 / total as f64 >= self.config.classify_threshold {
            return DayClass::Good;
        }

        self.classify_partial(day)
    }

    /// Split a partial day by its rain pattern.
    fn classify_partial(&self, day: &WeatherDay) -> DayClass {
        let samples = &day.hourly;
        let first_bad = samples.first().map(|s| self.sample_is_bad(s)).unwrap_or(false);
        let last_bad = samples.last().map(|s| self.sample_is_bad(s)).unwrap_or(false);

        if first_bad && !last_bad {
            // Morning rain, afternoon clear. The clearing hour is the first
            // hour with no later bad sample.
            let last_bad_idx = samples
                .iter()
                .rposition(|s| self.sample_is_bad(s))
                .unwrap_or(0);
            if let Some(clear) = samples.get(last_bad_idx + 1) {
                return DayClass::Delay {
                    safe_start_hour: (clear.hour24 + 1).min(MAX_DELAYED_START_HOUR),
                    previous_night_rain: false,
                };
            }
        }

        if !first_bad && last_bad {
            // Morning clear, evening rain. Work until the last clear hour.
            let first_bad_idx = samples
                .iter()
                .position(|s| self.sample_is_bad(s))
                .unwrap_or(0);
            if first_bad_idx > 0 {
                return DayClass::StartEarly {
                    last_good_hour: samples[first_bad_idx - 1].hour24,
                };
            }
        }

        DayClass::Mixed
    }

    fn sample_is_bad(&self, sample: &crate::model::HourlyForecast) -> bool {
        sample.rain_mm > self.config.rain_threshold_mm || sample.is_severe()
    }

    /// Heavy when any sample carries real rain volume or thunder.
    fn severity(&self, day: &WeatherDay) -> Severity {
        let heavy = day.hourly.iter().any(|s| {
            s.rain_mm > self.config.heavy_rain_mm
                || s.description.to_lowercase().contains("thunder")
        });
        if heavy { Severity::Heavy } else { Severity::Moderate }
    }

    fn previous_night_was_wet(&self, previous: Option<&WeatherDay>) -> bool {
        previous.is_some_and(|p| {
            p.hourly.iter().any(|s| {
                s.hour24 >= self.config.night_from_hour
                    && (s.rain_mm > self.config.night_rain_mm || s.is_severe())
            })
        })
    }
}
