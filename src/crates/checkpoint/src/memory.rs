//! `MemoryCheckpointSaver` (§4.8.5): an in-process `RwLock`-guarded store, grounded in the
//! pcastone-orca's `InMemoryCheckpointSaver` (`langgraph-checkpoint/src/memory.rs`). Used for
//! tests and for `flowboard run` without `--db-path`.

use crate::error::Result;
use crate::saver::CheckpointSaver;
use crate::types::{Checkpoint, RunSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointSaver {
    runs: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemoryCheckpointSaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointSaver for MemoryCheckpointSaver {
    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.entry(checkpoint.run_id.clone()).or_default().push(checkpoint);
        Ok(())
    }

    async fn latest(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        let runs = self.runs.read().await;
        Ok(runs.get(run_id).and_then(|log| log.last().cloned()))
    }

    async fn get(&self, run_id: &str, cycle: u64, inference_count: u64) -> Result<Option<Checkpoint>> {
        let runs = self.runs.read().await;
        Ok(runs
            .get(run_id)
            .and_then(|log| log.iter().find(|c| c.cycle == cycle && c.inference_count == inference_count))
            .cloned())
    }

    async fn list_checkpoints(&self, run_id: &str) -> Result<Vec<Checkpoint>> {
        let runs = self.runs.read().await;
        Ok(runs.get(run_id).cloned().unwrap_or_default())
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut summaries: Vec<RunSummary> = runs
            .iter()
            .filter_map(|(run_id, log)| {
                let first = log.first()?;
                let last = log.last()?;
                Some(RunSummary {
                    run_id: run_id.clone(),
                    first_at: first.at,
                    last_at: last.at,
                    execution_count: log.len() as u64,
                    max_cycle: log.iter().map(|c| c.cycle).max().unwrap_or(0),
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.last_at.cmp(&a.last_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConceptSnapshot, ItemSnapshot, TrackerSnapshot};
    use chrono::Utc;
    use serde_json::json;

    fn checkpoint(run_id: &str, cycle: u64) -> Checkpoint {
        Checkpoint {
            run_id: run_id.to_string(),
            cycle,
            inference_count: cycle,
            at: Utc::now(),
            concepts: vec![ConceptSnapshot {
                name: "a".into(),
                status: "complete".into(),
                concept_type: "{}".into(),
                reference_data: Some(json!([1, 2])),
                reference_axes: Some(vec!["x".into()]),
                reference_shape: Some(vec![2]),
                is_ground_concept: true,
                is_final_concept: false,
            }],
            items: vec![ItemSnapshot {
                flow_index: "1".into(),
                status: "completed".into(),
                execution_count: 1,
                result: None,
            }],
            tracker: TrackerSnapshot::default(),
            workspace: json!({}),
        }
    }

    #[tokio::test]
    async fn put_then_latest_round_trips() {
        let saver = MemoryCheckpointSaver::new();
        saver.put(checkpoint("r1", 1)).await.unwrap();
        saver.put(checkpoint("r1", 2)).await.unwrap();
        let latest = saver.latest("r1").await.unwrap().unwrap();
        assert_eq!(latest.cycle, 2);
    }

    #[tokio::test]
    async fn list_runs_reports_max_cycle() {
        let saver = MemoryCheckpointSaver::new();
        saver.put(checkpoint("r1", 1)).await.unwrap();
        saver.put(checkpoint("r1", 3)).await.unwrap();
        let runs = saver.list_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].max_cycle, 3);
        assert_eq!(runs[0].execution_count, 2);
    }
}
