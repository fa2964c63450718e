//! Day packing, job lifecycle, manual reorder, and undo.

mod jobs;
mod reorder;
pub mod slots;
mod undo;

pub use jobs::{EnsureSummary, JobPlanner};
pub use reorder::{CommitOutcome, MoveOutcome, MovePlan, MoveRequest, ReorderController};
pub use undo::{UndoController, UndoOutcome, UndoRecord};
