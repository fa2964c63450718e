//! Forecast records consumed by the classifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One hourly forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Hour of day, 0-23.
    pub hour24: u8,
    /// Human-readable conditions ("Moderate rain", "Clear sky", ...).
    pub description: String,
    /// Expected rainfall for the hour in millimetres.
    pub rain_mm: f64,
}

impl HourlyForecast {
    /// Severe descriptors mark a sample bad regardless of measured rain.
    pub fn is_severe(&self) -> bool {
        let desc = self.description.to_lowercase();
        desc.contains("thunder") || desc.contains("heavy") || desc.contains("storm")
    }
}

/// A day's forecast with ordered hourly samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub date: NaiveDate,
    /// Chance of precipitation, 0-100.
    pub precipitation_chance: u8,
    /// Hourly samples in ascending hour order. May be empty when the
    /// provider had no hourly data for the day.
    pub hourly: Vec<HourlyForecast>,
}

impl WeatherDay {
    /// A day with no hourly samples yet.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            precipitation_chance: 0,
            hourly: Vec::new(),
        }
    }
}

/// A geocoded location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
    /// Display name reported by the geocoder.
    pub name: String,
}
