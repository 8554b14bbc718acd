//! Run registry: tracks orchestrators spawned by `flowboard serve`, bridging each one's
//! single-consumer `EventSink` into a multi-consumer `broadcast` channel for SSE fan-out and a
//! bounded ring buffer for the `/logs` endpoint.

use flowboard_checkpoint::CheckpointSaver;
use flowboard_core::events::Event;
use flowboard_core::orchestrator::{Orchestrator, RunReport};
use flowboard_core::RunControl;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const LOG_RING_CAPACITY: usize = 1000;

fn flow_index_of(event: &Event) -> Option<String> {
    match event {
        Event::InferenceStarted { flow_index, .. }
        | Event::InferenceCompleted { flow_index, .. }
        | Event::InferenceFailed { flow_index, .. }
        | Event::BreakpointHit { flow_index } => Some(flow_index.clone()),
        Event::LogEntry { flow_index, .. } => flow_index.clone(),
        _ => None,
    }
}

pub struct LiveRun {
    pub run_id: String,
    pub control: Arc<RunControl>,
    events: broadcast::Sender<Event>,
    log_ring: RwLock<VecDeque<Event>>,
}

impl LiveRun {
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn logs(&self, limit: usize, flow_index: Option<&str>) -> Vec<Event> {
        let ring = self.log_ring.read().expect("log ring lock poisoned");
        ring.iter()
            .rev()
            .filter(|event| flow_index.map_or(true, |f| flow_index_of(event).as_deref() == Some(f)))
            .take(limit)
            .cloned()
            .collect()
    }
}

pub struct RunRegistry {
    live: RwLock<HashMap<String, Arc<LiveRun>>>,
    saver: Arc<dyn CheckpointSaver>,
}

impl RunRegistry {
    pub fn new(saver: Arc<dyn CheckpointSaver>) -> Self {
        Self { live: RwLock::new(HashMap::new()), saver }
    }

    pub fn saver(&self) -> &Arc<dyn CheckpointSaver> {
        &self.saver
    }

    pub fn live_run(&self, run_id: &str) -> Option<Arc<LiveRun>> {
        self.live.read().expect("run registry lock poisoned").get(run_id).cloned()
    }

    /// Builds the event bridge and control handle for a run, registers it, then hands the
    /// caller an already-wired `Orchestrator` to spawn onto its own task. The registry entry is
    /// removed once the run finishes (§5 "a terminal event ... stops the reconnection loop").
    pub fn prepare(&self, orchestrator: Orchestrator, run_id: String) -> (Orchestrator, Arc<RunControl>) {
        let control = Arc::new(RunControl::new());
        let (sink, mut rx) = flowboard_core::events::EventSink::channel(EVENT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let live = Arc::new(LiveRun {
            run_id: run_id.clone(),
            control: control.clone(),
            events: broadcast_tx.clone(),
            log_ring: RwLock::new(VecDeque::with_capacity(LOG_RING_CAPACITY)),
        });
        self.live.write().expect("run registry lock poisoned").insert(run_id.clone(), live.clone());

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let _ = broadcast_tx.send(event.clone());
                let mut ring = live.log_ring.write().expect("log ring lock poisoned");
                if ring.len() == LOG_RING_CAPACITY {
                    ring.pop_front();
                }
                ring.push_back(event);
            }
        });

        let orchestrator = orchestrator.with_events(sink).with_control(control.clone());
        (orchestrator, control)
    }
}

/// Spawns an already-wired orchestrator (from `RunRegistry::prepare`) onto its own task and
/// evicts the registry entry once it completes, regardless of outcome.
pub fn spawn_run(registry: Arc<RunRegistry>, run_id: String, orchestrator: Orchestrator) {
    tokio::spawn(async move {
        let result = orchestrator.run().await;
        match result {
            Ok(RunReport { deadlocked, stopped, .. }) => {
                tracing::info!(run_id, deadlocked, stopped, "run finished");
            }
            Err(error) => {
                tracing::error!(run_id, %error, "run ended in error");
            }
        }
        registry.live.write().expect("run registry lock poisoned").remove(&run_id);
    });
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RunRegistry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inference_started(flow_index: &str) -> Event {
        Event::InferenceStarted { flow_index: flow_index.to_string(), kind: "test".to_string() }
    }

    #[test]
    fn flow_index_of_extracts_from_inference_events() {
        assert_eq!(flow_index_of(&inference_started("step.1")), Some("step.1".to_string()));
        let run_started = Event::RunStarted { run_id: "r".to_string(), plan_id: None, at: chrono::Utc::now() };
        assert_eq!(flow_index_of(&run_started), None);
    }

    #[test]
    fn live_run_logs_filter_by_flow_index_and_newest_first() {
        let (events, _rx) = broadcast::channel(8);
        let live = LiveRun {
            run_id: "r".to_string(),
            control: Arc::new(RunControl::new()),
            events,
            log_ring: RwLock::new(VecDeque::new()),
        };
        {
            let mut ring = live.log_ring.write().unwrap();
            ring.push_back(inference_started("a"));
            ring.push_back(inference_started("b"));
            ring.push_back(inference_started("a"));
        }
        let all = live.logs(10, None);
        assert_eq!(all.len(), 3);
        assert_eq!(flow_index_of(&all[0]), Some("a".to_string()));

        let filtered = live.logs(10, Some("a"));
        assert_eq!(filtered.len(), 2);
    }
}
