//! Drive-time resolution and rolling route optimization.

mod drive_time;
mod optimizer;

pub use drive_time::DriveTimeEstimator;
pub use optimizer::{OptimizeState, OptimizeSummary, RouteOptimizationOrchestrator};
