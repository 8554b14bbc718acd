//! Error taxonomy for the orchestrator core.
//!
//! Mirrors §7 of the specification: configuration errors are fatal at construction,
//! while readiness exhaustion/deadlock/cycle-budget exhaustion are reported but not
//! fatal to the process.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowboardError>;

#[derive(Debug, Error)]
pub enum FlowboardError {
    #[error("duplicate concept name: {0}")]
    DuplicateConcept(String),

    #[error("inference {flow_index} references unknown concept {concept}")]
    UnknownConcept { flow_index: String, concept: String },

    #[error("malformed flow index: {0}")]
    MalformedFlowIndex(String),

    #[error("unknown sequence kind: {0}")]
    UnknownSequenceKind(String),

    #[error("failed to parse repository file {path}: {source}")]
    RepoParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read repository file {path}: {source}")]
    RepoIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint load failed: {0}")]
    CheckpointLoad(String),

    #[error("checkpoint store error: {0}")]
    CheckpointStore(#[from] flowboard_checkpoint::CheckpointError),

    #[error("no checkpoint found for run {0}")]
    CheckpointNotFound(String),

    #[error("inference {flow_index} failed: {message}")]
    InferenceFailed { flow_index: String, message: String },

    #[error("user interaction required: {interaction_type} ({prompt})")]
    NeedsUserInput {
        interaction_id: String,
        interaction_type: String,
        prompt: String,
    },
}
