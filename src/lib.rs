//! Weather-aware field service scheduling engine.
//!
//! `raincheck` packs a field crew's day into hourly slots, watches the
//! forecast, proposes job moves and start-time shifts around bad weather,
//! sequences multi-day routes against an external mapping service (with a
//! deterministic offline fallback), and supports manual reorder with a
//! short-lived undo.
//!
//! The crate is a library with no network or CLI surface of its own. A
//! presentation layer drives it, and every external collaborator enters
//! through an async trait:
//! - [`store::JobStore`] / [`store::CustomerStore`] for persistence
//! - [`provider::WeatherProvider`] for forecasts and geocoding
//! - [`provider::RouteProvider`] for drive times and multi-stop optimization
//!
//! Data flows forecast-first: weather classification feeds the suggestion
//! engine, accepted suggestions mutate job records through the stores, the
//! slot allocator recomputes display slots, and the drive-time estimator
//! annotates the result with travel times.

pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod route;
pub mod schedule;
pub mod store;

pub use config::{EngineConfig, RouteConfig, WeatherConfig};
pub use error::{OptimizeError, RouteError, StoreError, WeatherError};
pub use forecast::{DayClass, SuggestionEngine, WeatherClassifier};
pub use model::{
    Coordinates, Customer, DayTiming, DayTimingOverrides, Frequency, HourlyForecast, Job,
    JobStatus, NewJob, Severity, ShiftKind, Suggestion, WeatherDay,
};
pub use provider::{DriveTime, RouteProvider, WeatherProvider};
pub use route::{DriveTimeEstimator, OptimizeState, RouteOptimizationOrchestrator};
pub use schedule::{JobPlanner, ReorderController, UndoController};
pub use store::{CustomerStore, JobStore};
