//! Checkpoint data types (§4.8.1), adapted from pcastone-orca's
//! `langgraph-checkpoint/src/checkpoint.rs` channel-versioned `Checkpoint`/`CheckpointConfig`
//! shape to this orchestrator's run/cycle/inference-count keying.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a loaded checkpoint's per-concept data merges with the incoming repo (§4.8.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileMode {
    Patch,
    Overwrite,
    FillGaps,
}

impl Default for ReconcileMode {
    fn default() -> Self {
        ReconcileMode::Patch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptSnapshot {
    pub name: String,
    pub status: String,
    pub concept_type: String,
    pub reference_data: Option<Value>,
    pub reference_axes: Option<Vec<String>>,
    pub reference_shape: Option<Vec<usize>>,
    pub is_ground_concept: bool,
    pub is_final_concept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub flow_index: String,
    pub status: String,
    pub execution_count: u64,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerSnapshot {
    pub cycle_count: u64,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub retry_count: u64,
    pub completion_order: Vec<String>,
    pub execution_history: Value,
}

/// A single checkpoint write, keyed by `(run_id, cycle, inference_count)` (§4.8.1, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    pub cycle: u64,
    pub inference_count: u64,
    pub at: DateTime<Utc>,
    pub concepts: Vec<ConceptSnapshot>,
    pub items: Vec<ItemSnapshot>,
    pub tracker: TrackerSnapshot,
    pub workspace: Value,
}

impl Checkpoint {
    pub fn key(&self) -> (String, u64, u64) {
        (self.run_id.clone(), self.cycle, self.inference_count)
    }
}

/// Summary row for `list-runs` (§6.2, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub first_at: DateTime<Utc>,
    pub last_at: DateTime<Utc>,
    pub execution_count: u64,
    pub max_cycle: u64,
}
