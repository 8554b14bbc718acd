//! Error types for checkpoint persistence, grounded in pcastone-orca's checkpoint crate
//! (`langgraph-checkpoint/src/error.rs`), narrowed to the backends this orchestrator ships.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("no checkpoint found for run {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid checkpoint: {0}")]
    Invalid(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("sqlite migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
