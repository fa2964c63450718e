//! Weather provider seam and the Open-Meteo client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use reqwest::Client;
use serde::Deserialize;

use crate::config::WeatherConfig;
use crate::error::WeatherError;
use crate::model::{Coordinates, HourlyForecast, WeatherDay};

/// Source of forecasts and geocoding.
///
/// Failure is non-fatal everywhere this trait is consumed: a dead weather
/// service means an empty suggestion set, never a crashed schedule.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Daily forecasts with hourly samples for the given coordinates.
    async fn get_weather(&self, coords: &Coordinates) -> Result<Vec<WeatherDay>, WeatherError>;

    /// Resolve a free-text address. `None` when the service has no match.
    async fn geocode(&self, text: &str) -> Result<Option<Coordinates>, WeatherError>;
}

/// Open-Meteo forecast + geocoding client.
pub struct OpenMeteoClient {
    client: Client,
    config: WeatherConfig,
}

impl OpenMeteoClient {
    pub fn new(config: WeatherConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn get_weather(&self, coords: &Coordinates) -> Result<Vec<WeatherDay>, WeatherError> {
        let url = format!(
            "{}/v1/forecast",
            self.config.forecast_url.trim_end_matches('/')
        );

        tracing::debug!("Requesting forecast for {}: {}", coords.name, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", coords.lat.to_string()),
                ("longitude", coords.lon.to_string()),
                ("hourly", "precipitation,weather_code".to_string()),
                (
                    "daily",
                    "precipitation_probability_max".to_string(),
                ),
                ("forecast_days", self.config.forecast_days.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(WeatherError::RequestFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::InvalidResponse {
                reason: format!("JSON parse error: {}", e),
            })?;

        Ok(assemble_days(parsed))
    }

    async fn geocode(&self, text: &str) -> Result<Option<Coordinates>, WeatherError> {
        let url = format!("{}/v1/search", self.config.geocode_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("name", text), ("count", "1")])
            .send()
            .await
            .map_err(|e| WeatherError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::RequestFailed {
                reason: format!("HTTP {}", status),
            });
        }

        let parsed: GeocodeResponse =
            response
                .json()
                .await
                .map_err(|e| WeatherError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        Ok(parsed.results.and_then(|r| r.into_iter().next()).map(|hit| {
            Coordinates {
                lat: hit.latitude,
                lon: hit.longitude,
                name: hit.name,
            }
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyBlock,
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    precipitation: Vec<Option<f64>>,
    weather_code: Vec<Option<u16>>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    precipitation_probability_max: Vec<Option<u8>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Option<Vec<GeocodeHit>>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    latitude: f64,
    longitude: f64,
    name: String,
}

/// Fold the columnar wire format into per-day records with ordered samples.
fn assemble_days(parsed: ForecastResponse) -> Vec<WeatherDay> {
    let mut days: BTreeMap<chrono::NaiveDate, Vec<HourlyForecast>> = BTreeMap::new();

    let hourly = parsed.hourly;
    for (idx, stamp) in hourly.time.iter().enumerate() {
        let Ok(at) = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M") else {
            continue;
        };
        let rain_mm = hourly
            .precipitation
            .get(idx)
            .copied()
            .flatten()
            .unwrap_or(0.0);
        let code = hourly.weather_code.get(idx).copied().flatten().unwrap_or(0);

        days.entry(at.date()).or_default().push(HourlyForecast {
            hour24: at.time().hour() as u8,
            description: describe_weather_code(code).to_string(),
            rain_mm,
        });
    }

    let chances: BTreeMap<chrono::NaiveDate, u8> = parsed
        .daily
        .map(|daily| {
            daily
                .time
                .iter()
                .zip(daily.precipitation_probability_max)
                .filter_map(|(stamp, chance)| {
                    let date = chrono::NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()?;
                    Some((date, chance.unwrap_or(0)))
                })
                .collect()
        })
        .unwrap_or_default();

    days.into_iter()
        .map(|(date, hourly)| WeatherDay {
            date,
            precipitation_chance: chances.get(&date).copied().unwrap_or(0),
            hourly,
        })
        .collect()
}

/// WMO weather interpretation codes, reduced to the descriptors the
/// classifier cares about.
fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71..=77 => "Snow",
        80 | 81 => "Rain showers",
        82 => "Heavy rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}
