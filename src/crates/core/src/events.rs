//! The events contract (§4.9) and its `mpsc`-backed sink (§5).
//!
//! Grounded in pcastone-orca's event-bus pattern (a typed event enum fanned out over a
//! bounded `tokio::sync::mpsc` channel, logged to `tracing` regardless of whether a subscriber
//! is attached). Emission is fire-and-forget from the orchestrator's perspective: `try_send`
//! never blocks the main loop, and a full channel drops the oldest `LogEntry` rather than a
//! lifecycle event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag", content = "payload")]
pub enum Event {
    #[serde(rename = "run:started")]
    RunStarted { run_id: String, plan_id: Option<String>, at: DateTime<Utc> },
    #[serde(rename = "cycle:started")]
    CycleStarted { cycle: u64 },
    #[serde(rename = "inference:started")]
    InferenceStarted { flow_index: String, kind: String },
    #[serde(rename = "inference:completed")]
    InferenceCompleted { flow_index: String, result_summary: String },
    #[serde(rename = "inference:failed")]
    InferenceFailed { flow_index: String, error: String },
    #[serde(rename = "execution:progress")]
    ExecutionProgress { completed: u64, total: u64, cycle: u64 },
    #[serde(rename = "breakpoint:hit")]
    BreakpointHit { flow_index: String },
    #[serde(rename = "run:completed")]
    RunCompleted { run_id: String, final_concepts_summary: Value },
    #[serde(rename = "run:failed")]
    RunFailed { run_id: String, error: String },
    #[serde(rename = "execution:stopped")]
    ExecutionStopped { run_id: String },
    #[serde(rename = "log:entry")]
    LogEntry { level: String, flow_index: Option<String>, message: String, ts: DateTime<Utc> },
}

impl Event {
    /// Lifecycle events are never dropped under backpressure; only `LogEntry` is disposable.
    fn is_disposable(&self) -> bool {
        matches!(self, Event::LogEntry { .. })
    }

    fn log_to_tracing(&self) {
        match self {
            Event::LogEntry { level, flow_index, message, .. } => match level.as_str() {
                "error" => tracing::error!(flow_index = ?flow_index, "{message}"),
                "warn" => tracing::warn!(flow_index = ?flow_index, "{message}"),
                "debug" => tracing::debug!(flow_index = ?flow_index, "{message}"),
                _ => tracing::info!(flow_index = ?flow_index, "{message}"),
            },
            Event::InferenceFailed { flow_index, error } => {
                tracing::warn!(flow_index, error, "inference failed");
            }
            Event::RunFailed { run_id, error } => {
                tracing::error!(run_id, error, "run failed");
            }
            other => tracing::debug!(?other, "event"),
        }
    }
}

#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    /// Spawns the bounded channel; the returned receiver should be drained by a background
    /// task (e.g. the SSE broadcaster in the server crate).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// A sink with no consumer attached; events still reach `tracing`.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::channel(256);
        Self { tx }
    }

    pub fn emit(&self, event: Event) {
        event.log_to_tracing();
        match self.tx.try_send(event) {
            Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                if !dropped.is_disposable() {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(dropped).await;
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_events_survive_a_full_channel() {
        let (sink, mut rx) = EventSink::channel(1);
        sink.emit(Event::LogEntry {
            level: "info".into(),
            flow_index: None,
            message: "filler".into(),
            ts: Utc::now(),
        });
        sink.emit(Event::RunStarted { run_id: "r1".into(), plan_id: None, at: Utc::now() });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Event::LogEntry { .. }));
    }
}
