//! The `CheckpointSaver` trait (§4.8.5): storage-agnostic persistence for the orchestrator.
//! Grounded in pcastone-orca's `CheckpointSaver` trait (`langgraph-checkpoint/src/
//! traits.rs`), narrowed from thread/channel-versioned graph checkpoints to this
//! orchestrator's run/cycle/inference-count keyed snapshots.

use crate::error::Result;
use crate::types::{Checkpoint, RunSummary};
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Append a new checkpoint to the run's log.
    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint for `run_id`, if any.
    async fn latest(&self, run_id: &str) -> Result<Option<Checkpoint>>;

    /// A specific checkpoint identified by its full key.
    async fn get(&self, run_id: &str, cycle: u64, inference_count: u64) -> Result<Option<Checkpoint>>;

    /// All checkpoints for `run_id`, oldest first.
    async fn list_checkpoints(&self, run_id: &str) -> Result<Vec<Checkpoint>>;

    /// Every run known to this store, most recently active first.
    async fn list_runs(&self) -> Result<Vec<RunSummary>>;
}
