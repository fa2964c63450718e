//! External service seams.
//!
//! Forecasts, geocoding, drive times, and multi-stop optimization all come
//! from outside. Each concern is a trait plus a shipped HTTP client; the
//! engine degrades gracefully when either service is unreachable (empty
//! suggestions, deterministic drive-time fallback).

mod route;
mod weather;

pub use route::{
    DriveTime, MapQuestClient, OptimizedRoute, RouteProvider, RouteSegment, RouteStop,
};
pub use weather::{OpenMeteoClient, WeatherProvider};
