//! Run control surface (§6.3, §5 "Remote execution"): a shared handle letting an external
//! caller (the HTTP/SSE server) pause, resume, single-step, stop, and set breakpoints on a
//! running orchestrator without reaching into its single-threaded state directly.
//!
//! The orchestrator only ever touches this handle from its own main-loop task; the server calls
//! the mutating methods from request handlers running on other tasks, so every field is built
//! from atomics/locks that are cheap to contend on the low frequency this is used at.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct RunControl {
    paused: AtomicBool,
    stopped: AtomicBool,
    step_budget: AtomicBool,
    breakpoints: RwLock<HashSet<String>>,
    resume: Notify,
    pending_overrides: RwLock<Vec<PendingOverride>>,
}

#[derive(Debug, Clone)]
pub struct PendingOverride {
    pub concept_name: String,
    pub new_value: serde_json::Value,
    pub rerun_dependents: bool,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    /// Allow exactly one more dispatch to proceed, then re-pause automatically.
    pub fn step(&self) {
        self.step_budget.store(true, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn set_breakpoint(&self, flow_index: String, enabled: bool) {
        let mut breakpoints = self.breakpoints.write().expect("breakpoints lock poisoned");
        if enabled {
            breakpoints.insert(flow_index);
        } else {
            breakpoints.remove(&flow_index);
        }
    }

    pub fn clear_breakpoint(&self, flow_index: &str) {
        self.breakpoints.write().expect("breakpoints lock poisoned").remove(flow_index);
    }

    pub fn clear_all_breakpoints(&self) {
        self.breakpoints.write().expect("breakpoints lock poisoned").clear();
    }

    pub fn has_breakpoint(&self, flow_index: &str) -> bool {
        self.breakpoints.read().expect("breakpoints lock poisoned").contains(flow_index)
    }

    pub fn breakpoints(&self) -> Vec<String> {
        self.breakpoints.read().expect("breakpoints lock poisoned").iter().cloned().collect()
    }

    pub fn push_override(&self, ov: PendingOverride) {
        self.pending_overrides.write().expect("overrides lock poisoned").push(ov);
    }

    pub fn drain_overrides(&self) -> Vec<PendingOverride> {
        std::mem::take(&mut *self.pending_overrides.write().expect("overrides lock poisoned"))
    }

    /// Called at a dispatch boundary. Blocks (cooperatively) while paused, unless a single step
    /// has been granted or a stop has been requested.
    pub async fn wait_if_paused(&self) {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            if self.step_budget.swap(false, Ordering::SeqCst) {
                return;
            }
            if !self.paused.load(Ordering::SeqCst) {
                return;
            }
            self.resume.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resume_releases_a_paused_waiter() {
        let control = std::sync::Arc::new(RunControl::new());
        control.pause();
        let waiter = {
            let control = control.clone();
            tokio::spawn(async move { control.wait_if_paused().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());
        control.resume();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn step_grants_exactly_one_pass() {
        let control = RunControl::new();
        control.pause();
        control.step();
        control.wait_if_paused().await;
        assert!(control.is_paused());
    }

    #[test]
    fn breakpoints_toggle() {
        let control = RunControl::new();
        control.set_breakpoint("1.1".to_string(), true);
        assert!(control.has_breakpoint("1.1"));
        control.clear_breakpoint("1.1");
        assert!(!control.has_breakpoint("1.1"));
    }
}
