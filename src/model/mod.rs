//! Domain records shared across the engine.
//!
//! Everything here is plain data: classification, suggestion, and slot
//! logic derive from these records and never persist state of their own.

mod customer;
mod job;
mod suggestion;
mod timing;
mod weather;

pub use customer::{Customer, Frequency};
pub use job::{Job, JobStatus, NewJob};
pub use suggestion::{Severity, ShiftKind, Suggestion};
pub use timing::{DEFAULT_DAY_END_HOUR, DEFAULT_DAY_START_HOUR, DayTiming, DayTimingOverrides};
pub use weather::{Coordinates, HourlyForecast, WeatherDay};
