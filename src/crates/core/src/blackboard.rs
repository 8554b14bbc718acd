//! The Blackboard: authoritative runtime state (§3 "Blackboard state").

use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptStatus {
    Empty,
    Pending,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Default)]
pub struct Blackboard {
    concept_status: HashMap<String, ConceptStatus>,
    completed_concept_timestamp: HashMap<String, DateTime<Utc>>,
    item_status: HashMap<String, ItemStatus>,
    item_execution_count: HashMap<String, u64>,
    item_result: HashMap<String, String>,
    item_error: HashMap<String, String>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    // -- concept status --

    pub fn concept_status(&self, name: &str) -> ConceptStatus {
        self.concept_status.get(name).copied().unwrap_or(ConceptStatus::Empty)
    }

    pub fn set_concept_empty(&mut self, name: &str) {
        self.concept_status.insert(name.to_string(), ConceptStatus::Empty);
    }

    pub fn set_concept_pending(&mut self, name: &str) {
        self.concept_status.insert(name.to_string(), ConceptStatus::Pending);
    }

    /// `empty→complete` or `pending→complete`. Writes the completion timestamp only on the
    /// first such transition (never overwritten, §3).
    pub fn set_concept_complete(&mut self, name: &str, now: DateTime<Utc>) {
        let was_complete = self.concept_status(name) == ConceptStatus::Complete;
        self.concept_status.insert(name.to_string(), ConceptStatus::Complete);
        if !was_complete {
            self.completed_concept_timestamp.entry(name.to_string()).or_insert(now);
        }
    }

    pub fn completed_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.completed_concept_timestamp.get(name).copied()
    }

    pub fn is_concept_complete(&self, name: &str) -> bool {
        self.concept_status(name) == ConceptStatus::Complete
    }

    // -- item status --

    pub fn item_status(&self, flow_index: &str) -> ItemStatus {
        self.item_status.get(flow_index).copied().unwrap_or(ItemStatus::Pending)
    }

    pub fn set_item_status(&mut self, flow_index: &str, status: ItemStatus) {
        self.item_status.insert(flow_index.to_string(), status);
    }

    pub fn execution_count(&self, flow_index: &str) -> u64 {
        self.item_execution_count.get(flow_index).copied().unwrap_or(0)
    }

    pub fn increment_execution_count(&mut self, flow_index: &str) {
        *self.item_execution_count.entry(flow_index.to_string()).or_insert(0) += 1;
    }

    pub fn set_result(&mut self, flow_index: &str, result: String) {
        self.item_result.insert(flow_index.to_string(), result);
    }

    pub fn result(&self, flow_index: &str) -> Option<&str> {
        self.item_result.get(flow_index).map(|s| s.as_str())
    }

    pub fn set_error(&mut self, flow_index: &str, error: String) {
        self.item_error.insert(flow_index.to_string(), error);
    }

    pub fn error(&self, flow_index: &str) -> Option<&str> {
        self.item_error.get(flow_index).map(|s| s.as_str())
    }

    pub fn is_complete(&self, flow_index: &str) -> bool {
        self.item_status(flow_index) == ItemStatus::Completed
    }

    /// Reserved for a future operator-facing reset surface (SPEC_FULL.md §9 "Open question —
    /// failed items"). Intentionally a no-op: the source leaves failed items alone and no
    /// resume semantics were specified for clearing them.
    pub fn clear_failed(&mut self, _flow_index: &str) {}

    pub fn all_items_completed<'a>(&self, flow_indices: impl Iterator<Item = &'a str>) -> bool {
        flow_indices.into_iter().all(|f| self.is_complete(f))
    }
}
