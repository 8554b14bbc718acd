//! Checkpoint reconciliation (§4.8.2–§4.8.4): merges a loaded `Checkpoint` into a freshly
//! constructed `ConceptRepo`/`InferenceRepo`/`Blackboard`/`ProcessTracker`/`Workspace` under one
//! of the three `ReconcileMode`s.

use crate::blackboard::{Blackboard, ItemStatus};
use crate::concept::ConceptRepo;
use crate::error::{FlowboardError, Result};
use crate::inference::InferenceRepo;
use crate::reference::Reference;
use crate::tracker::ProcessTracker;
use crate::workspace::Workspace;
use chrono::Utc;
use flowboard_checkpoint::{Checkpoint, ReconcileMode};

/// Verify every inference entry's referenced concepts exist in the loaded repo (§4.8.4).
pub fn validate_compatibility(inferences: &InferenceRepo, concepts: &ConceptRepo) -> Result<()> {
    for entry in inferences.all() {
        let mut check = |name: &str| -> Result<()> {
            if concepts.contains(name) {
                Ok(())
            } else {
                Err(FlowboardError::UnknownConcept {
                    flow_index: entry.flow_index.as_str().to_string(),
                    concept: name.to_string(),
                })
            }
        };
        check(&entry.concept_to_infer)?;
        if let Some(f) = &entry.function_concept {
            check(f)?;
        }
        for v in &entry.value_concepts {
            check(v)?;
        }
        for c in &entry.context_concepts {
            check(c)?;
        }
    }
    Ok(())
}

/// `(type, axes, shape)` per §4.8.2 — the concept's type tag is part of the signature, not just
/// the reference's shape, so a PATCH/OVERWRITE match never loads a snapshot whose concept
/// changed kind underneath the same name.
fn signature_of(snapshot: &flowboard_checkpoint::ConceptSnapshot) -> (String, Vec<String>, Vec<usize>) {
    (
        snapshot.concept_type.clone(),
        snapshot.reference_axes.clone().unwrap_or_default(),
        snapshot.reference_shape.clone().unwrap_or_default(),
    )
}

fn concept_type_tag(concept_type: crate::concept::ConceptType) -> String {
    serde_json::to_value(concept_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Apply a loaded checkpoint to in-memory state per §4.8.2. Returns the `ProcessTracker` and
/// `Workspace` restored from the checkpoint (always loaded unconditionally, per §4.8.2's
/// "Item statuses, execution counts, and tracker stats are loaded unconditionally").
pub fn apply(
    checkpoint: &Checkpoint,
    mode: ReconcileMode,
    concepts: &mut ConceptRepo,
    blackboard: &mut Blackboard,
) -> (ProcessTracker, Workspace) {
    for snapshot in &checkpoint.concepts {
        let Some(concept) = concepts.get_mut(&snapshot.name) else { continue };
        let incoming_signature = (
            concept_type_tag(concept.concept_type),
            concept.reference.as_ref().map(|r| r.axes.clone()).unwrap_or_default(),
            concept.reference.as_ref().map(|r| r.shape.clone()).unwrap_or_default(),
        );
        let checkpoint_signature = signature_of(snapshot);
        let signatures_match = incoming_signature == checkpoint_signature;
        let repo_is_empty = concept.reference.as_ref().map(|r| r.is_empty()).unwrap_or(true);

        let should_load = match mode {
            ReconcileMode::Patch => signatures_match,
            ReconcileMode::Overwrite => true,
            ReconcileMode::FillGaps => repo_is_empty,
        };

        if should_load {
            if let Some(data) = &snapshot.reference_data {
                concept.reference = Some(Reference::new(
                    snapshot.reference_axes.clone().unwrap_or_default(),
                    snapshot.reference_shape.clone().unwrap_or_default(),
                    data.as_array()
                        .map(|arr| {
                            arr.iter().cloned().map(|v| if v.is_null() { None } else { Some(v) }).collect()
                        })
                        .unwrap_or_default(),
                ));
            }
            blackboard.set_concept_complete(&snapshot.name, Utc::now());
        }
    }

    for item in &checkpoint.items {
        let status = match item.status.as_str() {
            "completed" => ItemStatus::Completed,
            "failed" => ItemStatus::Failed,
            "in_progress" => ItemStatus::InProgress,
            _ => ItemStatus::Pending,
        };
        blackboard.set_item_status(&item.flow_index, status);
        for _ in 0..item.execution_count {
            blackboard.increment_execution_count(&item.flow_index);
        }
        if let Some(result) = &item.result {
            blackboard.set_result(&item.flow_index, result.clone());
        }
    }

    let mut tracker = ProcessTracker::new();
    tracker.cycle_count = checkpoint.tracker.cycle_count;
    tracker.total_executions = checkpoint.tracker.total_executions;
    tracker.successful_executions = checkpoint.tracker.successful_executions;
    tracker.retry_count = checkpoint.tracker.retry_count;
    tracker.completion_order = checkpoint.tracker.completion_order.clone();

    let workspace = Workspace::from_value(checkpoint.workspace.clone());

    (tracker, workspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{ConceptRecord, ConceptType};
    use flowboard_checkpoint::{ConceptSnapshot, ItemSnapshot, TrackerSnapshot};
    use serde_json::json;

    fn repo() -> ConceptRepo {
        ConceptRepo::from_records(vec![ConceptRecord {
            id: "a".into(),
            concept_name: "a".into(),
            concept_type: ConceptType::Object,
            axis_name: None,
            description: None,
            reference_data: None,
            reference_axis_names: None,
            is_ground_concept: false,
            is_final_concept: false,
            is_invariant: false,
        }])
        .unwrap()
    }

    fn checkpoint_with(signature: (Vec<String>, Vec<usize>)) -> Checkpoint {
        checkpoint_with_type(signature, "{}")
    }

    fn checkpoint_with_type(signature: (Vec<String>, Vec<usize>), concept_type: &str) -> Checkpoint {
        Checkpoint {
            run_id: "r1".into(),
            cycle: 1,
            inference_count: 1,
            at: Utc::now(),
            concepts: vec![ConceptSnapshot {
                name: "a".into(),
                status: "complete".into(),
                concept_type: concept_type.into(),
                reference_data: Some(json!([1, 2])),
                reference_axes: Some(signature.0),
                reference_shape: Some(signature.1),
                is_ground_concept: false,
                is_final_concept: false,
            }],
            items: vec![ItemSnapshot {
                flow_index: "1".into(),
                status: "completed".into(),
                execution_count: 2,
                result: None,
            }],
            tracker: TrackerSnapshot::default(),
            workspace: json!({}),
        }
    }

    #[test]
    fn patch_skips_when_signature_differs() {
        let mut concepts = repo();
        let mut blackboard = Blackboard::new();
        let checkpoint = checkpoint_with((vec!["x".into()], vec![2]));
        apply(&checkpoint, ReconcileMode::Patch, &mut concepts, &mut blackboard);
        assert!(concepts.get("a").unwrap().reference.is_none());
    }

    #[test]
    fn overwrite_loads_regardless_of_signature() {
        let mut concepts = repo();
        let mut blackboard = Blackboard::new();
        let checkpoint = checkpoint_with((vec!["x".into()], vec![2]));
        apply(&checkpoint, ReconcileMode::Overwrite, &mut concepts, &mut blackboard);
        assert!(concepts.get("a").unwrap().reference.is_some());
        assert!(blackboard.is_concept_complete("a"));
    }

    #[test]
    fn item_statuses_and_counts_load_unconditionally() {
        let mut concepts = repo();
        let mut blackboard = Blackboard::new();
        let checkpoint = checkpoint_with((vec![], vec![]));
        apply(&checkpoint, ReconcileMode::Patch, &mut concepts, &mut blackboard);
        assert_eq!(blackboard.execution_count("1"), 2);
        assert!(blackboard.is_complete("1"));
    }

    #[test]
    fn patch_skips_when_concept_type_differs_even_with_matching_shape() {
        let mut concepts = repo();
        let mut blackboard = Blackboard::new();
        // `repo()`'s concept "a" has no reference yet, so its shape/axes are empty — matching
        // this snapshot's — but the snapshot's type tag ("::") differs from "a"'s ("{}").
        let checkpoint = checkpoint_with_type((vec![], vec![]), "::");
        apply(&checkpoint, ReconcileMode::Patch, &mut concepts, &mut blackboard);
        assert!(concepts.get("a").unwrap().reference.is_none());
    }

    #[test]
    fn skip_cells_round_trip_through_reference_data() {
        let mut concepts = repo();
        let mut blackboard = Blackboard::new();
        let mut checkpoint = checkpoint_with((vec!["x".into()], vec![3]));
        checkpoint.concepts[0].reference_data = Some(json!([1, null, 3]));
        apply(&checkpoint, ReconcileMode::Overwrite, &mut concepts, &mut blackboard);
        let reference = concepts.get("a").unwrap().reference.as_ref().unwrap();
        assert_eq!(reference.data, vec![Some(json!(1)), None, Some(json!(3))]);
    }
}
