//! The dispatch `Outcome` contract (§4.3).

use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    PendingRetry,
    Failed,
    /// Distinguished signal carrying a user-interaction request (§7 item 6, §9 "Exceptions for
    /// control flow"), modeled as an explicit variant rather than an unwinding exception.
    NeedsUserInput,
}

#[derive(Debug, Clone)]
pub struct UserInteractionRequest {
    pub interaction_id: String,
    pub interaction_type: String,
    pub prompt: String,
    pub kwargs: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub status: Option<OutcomeStatus>,
    pub produced_reference: Option<Reference>,
    pub updated_references: HashMap<String, Reference>,
    pub timing_ready: bool,
    pub quantifying_complete: Option<bool>,
    pub error: Option<String>,
    pub interaction: Option<UserInteractionRequest>,
}

impl Outcome {
    pub fn completed(reference: Reference) -> Self {
        Self {
            status: Some(OutcomeStatus::Completed),
            produced_reference: Some(reference),
            ..Default::default()
        }
    }

    pub fn pending_retry(error: impl Into<String>) -> Self {
        Self {
            status: Some(OutcomeStatus::PendingRetry),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(OutcomeStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn needs_user_input(request: UserInteractionRequest) -> Self {
        Self {
            status: Some(OutcomeStatus::NeedsUserInput),
            interaction: Some(request),
            ..Default::default()
        }
    }

    pub fn with_updated_reference(mut self, name: impl Into<String>, reference: Reference) -> Self {
        self.updated_references.insert(name.into(), reference);
        self
    }
}
