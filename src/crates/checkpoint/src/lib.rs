//! Checkpoint persistence for the flowboard orchestrator (§4.8).

mod error;
mod memory;
mod saver;
mod sqlite;
mod types;

pub use error::{CheckpointError, Result};
pub use memory::MemoryCheckpointSaver;
pub use saver::CheckpointSaver;
pub use sqlite::SqliteCheckpointSaver;
pub use types::{Checkpoint, ConceptSnapshot, ItemSnapshot, ReconcileMode, RunSummary, TrackerSnapshot};
