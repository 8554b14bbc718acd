//! `ProcessTracker` — append-only attempt history (§2, §4.7.4, §4.8.1).

use serde::{Deserialize, Serialize};

use crate::inference::SequenceKind;
use crate::outcome::OutcomeStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub cycle: u64,
    pub flow_index: String,
    pub sequence_kind: SequenceKind,
    pub status: OutcomeStatus,
    pub concept_to_infer: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ProcessTracker {
    pub cycle_count: u64,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub retry_count: u64,
    pub completion_order: Vec<String>,
    pub execution_history: Vec<AttemptRecord>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: AttemptRecord) {
        self.total_executions += 1;
        match record.status {
            OutcomeStatus::Completed => {
                self.successful_executions += 1;
                self.completion_order.push(record.flow_index.clone());
            }
            OutcomeStatus::PendingRetry => {
                self.retry_count += 1;
            }
            OutcomeStatus::Failed | OutcomeStatus::NeedsUserInput => {}
        }
        self.execution_history.push(record);
    }

    pub fn begin_cycle(&mut self, cycle: u64) {
        self.cycle_count = cycle;
    }

    /// Bounded history as stored in a checkpoint (§4.8.1 "truncated `execution_history`").
    pub fn truncated_history(&self, max_len: usize) -> Vec<AttemptRecord> {
        let start = self.execution_history.len().saturating_sub(max_len);
        self.execution_history[start..].to_vec()
    }
}
