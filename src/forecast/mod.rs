//! Weather classification and schedule suggestions.
//!
//! The classifier is a pure function from forecast days to a day class;
//! the suggestion engine turns those classes plus the current job data
//! into move and start-time suggestions. Neither ever errors: missing
//! weather data simply yields no suggestions.

mod classifier;
mod suggest;

pub use classifier::{DayClass, WeatherClassifier};
pub use suggest::{AcceptSummary, SuggestionEngine};
