//! Sequence-kind dispatch (§4.3, §9 "Dynamic dispatch on sequence kind").
//!
//! Modeled as a tagged variant rather than a trait object hierarchy: one arm per
//! `SequenceKind`, each a free function with the uniform signature
//! `(entry, concept_repo, blackboard, workspace, body) -> Outcome`. No back-pointers from an
//! inference to the scheduler; the pipeline runs one direction only.

mod assigning;
mod grouping;
mod imperative;
mod judgement;
mod quantifying;
mod simple;
mod timing;

use crate::blackboard::Blackboard;
use crate::body::Body;
use crate::concept::ConceptRepo;
use crate::inference::{InferenceEntry, SequenceKind};
use crate::outcome::Outcome;
use crate::workspace::Workspace;

pub async fn invoke(
    entry: &InferenceEntry,
    repo: &ConceptRepo,
    blackboard: &Blackboard,
    workspace: &mut Workspace,
    body: &dyn Body,
) -> Outcome {
    match entry.inference_sequence {
        SequenceKind::Simple => simple::invoke(entry, repo),
        k if k.is_imperative_family() => imperative::invoke(entry, repo, body).await,
        k if k.is_judgement_family() => judgement::invoke(entry, repo, body).await,
        SequenceKind::Grouping => grouping::invoke(entry, repo),
        SequenceKind::Quantifying => quantifying::invoke(entry, repo, blackboard, workspace),
        SequenceKind::Assigning => assigning::invoke(entry, repo),
        SequenceKind::Timing => timing::invoke(entry, blackboard),
        _ => unreachable!("all SequenceKind variants are covered by the arms above"),
    }
}

/// Collect a value concept's current leaves as a JSON array, `Null` if the concept has no
/// reference yet (used by `imperative`/`judgement` to build the body's input map).
fn concept_leaves(repo: &ConceptRepo, name: &str) -> serde_json::Value {
    repo.get(name)
        .and_then(|c| c.reference.as_ref())
        .map(|r| serde_json::Value::Array(r.leaves()))
        .unwrap_or(serde_json::Value::Null)
}
