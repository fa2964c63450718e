//! Engine and provider configuration.
//!
//! Every undocumented heuristic in the scheduling rules lives here as a
//! named field so callers can tune it without touching the algorithms.
//! `from_env()` reads `RAINCHECK_*` variables, falling back to defaults for
//! anything unset.

use std::time::Duration;

/// Tunable knobs for the scheduling engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Days ahead scanned by auto-creation and route optimization.
    pub horizon_days: u32,
    /// Days of forecast consumed by the suggestion engine.
    pub forecast_days: u32,
    /// Default working-day start hour (24h).
    pub day_start_hour: u8,
    /// Default working-day end hour (24h).
    pub day_end_hour: u8,
    /// Fixed on-site service time per stop.
    pub service_minutes: u32,
    /// Fraction of hourly samples that must agree before a day is
    /// classified bad (or, symmetrically, good).
    pub classify_threshold: f64,
    /// Rain at or below this many millimetres counts as a workable hour.
    pub rain_threshold_mm: f64,
    /// Any sample above this marks a bad day's severity heavy.
    pub heavy_rain_mm: f64,
    /// Evening rain above this flags the next morning as wet grass.
    pub night_rain_mm: f64,
    /// Hour from which evening samples count toward the wet-grass rule.
    pub night_from_hour: u8,
    /// Fixed safe start hour the morning after a wet night.
    pub wet_grass_start_hour: u8,
    /// Suggested start hour for a start-early shift.
    pub early_start_hour: u8,
    /// How long the undo affordance stays alive after a move.
    pub undo_window: Duration,
    /// Concurrent per-day optimizer calls during a full pass.
    pub optimize_parallelism: usize,
    /// Drive minutes assumed when the optimizer omits a leg duration.
    pub fallback_leg_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            forecast_days: 5,
            day_start_hour: 5,
            day_end_hour: 18,
            service_minutes: 60,
            classify_threshold: 0.75,
            rain_threshold_mm: 1.0,
            heavy_rain_mm: 5.0,
            night_rain_mm: 3.0,
            night_from_hour: 17,
            wet_grass_start_hour: 10,
            early_start_hour: 6,
            undo_window: Duration::from_secs(5),
            optimize_parallelism: 4,
            fallback_leg_minutes: 10,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Some(v) = env_parse("RAINCHECK_HORIZON_DAYS") {
            cfg.horizon_days = v;
        }
        if let Some(v) = env_parse("RAINCHECK_FORECAST_DAYS") {
            cfg.forecast_days = v;
        }
        if let Some(v) = env_parse("RAINCHECK_DAY_START_HOUR") {
            cfg.day_start_hour = v;
        }
        if let Some(v) = env_parse("RAINCHECK_DAY_END_HOUR") {
            cfg.day_end_hour = v;
        }
        if let Some(v) = env_parse("RAINCHECK_SERVICE_MINUTES") {
            cfg.service_minutes = v;
        }
        if let Some(v) = env_parse("RAINCHECK_CLASSIFY_THRESHOLD") {
            cfg.classify_threshold = v;
        }
        if let Some(v) = env_parse("RAINCHECK_RAIN_THRESHOLD_MM") {
            cfg.rain_threshold_mm = v;
        }
        if let Some(v) = env_parse("RAINCHECK_HEAVY_RAIN_MM") {
            cfg.heavy_rain_mm = v;
        }
        if let Some(v) = env_parse("RAINCHECK_NIGHT_RAIN_MM") {
            cfg.night_rain_mm = v;
        }
        if let Some(v) = env_parse("RAINCHECK_UNDO_WINDOW_SECS") {
            cfg.undo_window = Duration::from_secs(v);
        }
        if let Some(v) = env_parse("RAINCHECK_OPTIMIZE_PARALLELISM") {
            cfg.optimize_parallelism = v;
        }
        cfg
    }
}

/// Configuration for the weather provider client.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Base URL of the forecast API.
    pub forecast_url: String,
    /// Base URL of the geocoding API.
    pub geocode_url: String,
    /// Days of hourly forecast to request.
    pub forecast_days: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: "https://api.open-meteo.com".to_string(),
            geocode_url: "https://geocoding-api.open-meteo.com".to_string(),
            forecast_days: 5,
        }
    }
}

impl WeatherConfig {
    /// Load from `RAINCHECK_WEATHER_*` environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("RAINCHECK_WEATHER_FORECAST_URL") {
            cfg.forecast_url = v;
        }
        if let Ok(v) = std::env::var("RAINCHECK_WEATHER_GEOCODE_URL") {
            cfg.geocode_url = v;
        }
        if let Some(v) = env_parse("RAINCHECK_WEATHER_FORECAST_DAYS") {
            cfg.forecast_days = v;
        }
        cfg
    }
}

/// Configuration for the route/distance provider client.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Base URL of the directions API.
    pub base_url: String,
    /// API key, if the service requires one.
    pub api_key: Option<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.mapquestapi.com".to_string(),
            api_key: None,
        }
    }
}

impl RouteConfig {
    /// Load from `RAINCHECK_ROUTE_*` environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("RAINCHECK_ROUTE_BASE_URL") {
            cfg.base_url = v;
        }
        if let Ok(v) = std::env::var("RAINCHECK_ROUTE_API_KEY") {
            cfg.api_key = Some(v);
        }
        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.horizon_days, 30);
        assert_eq!(cfg.day_end_hour - cfg.day_start_hour, 13);
        assert_eq!(cfg.undo_window, Duration::from_secs(5));
    }
}
