//! `quantifying` sequence kind (§4.3, §4.4, §4.7.4). Each dispatch advances at most one
//! iteration: if the current iteration's in-loop concept has already been produced by the
//! supporting items (on an earlier cycle), record it and move the loop index forward; otherwise
//! report incomplete so the orchestrator resets the supporters for another pass.
//!
//! `working_interpretation`: `{"to_loop": "<concept>", "in_loop_concept": "<concept>"}`. Falls
//! back to `value_concepts[0]` / `context_concepts[0]` when absent.

use crate::blackboard::Blackboard;
use crate::concept::ConceptRepo;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::quantifier::Quantifier;
use crate::reference::Reference;
use crate::workspace::Workspace;
use serde_json::Value;

pub fn invoke(
    entry: &InferenceEntry,
    repo: &ConceptRepo,
    blackboard: &Blackboard,
    workspace: &mut Workspace,
) -> Outcome {
    let to_loop_name = entry
        .working_interpretation
        .get("to_loop")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| entry.value_concepts.first().cloned());
    let in_loop_name = entry
        .working_interpretation
        .get("in_loop_concept")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| entry.context_concepts.first().cloned());

    let base_concept = entry.concept_to_infer.as_str();

    let to_loop = to_loop_name
        .as_deref()
        .and_then(|n| repo.get(n))
        .and_then(|c| c.reference.clone())
        .unwrap_or_else(Reference::empty);

    if to_loop.base_elements().is_empty() {
        let mut outcome = Outcome::completed(Reference::empty());
        outcome.quantifying_complete = Some(true);
        return outcome;
    }

    let already_complete = in_loop_name
        .as_deref()
        .map(|n| blackboard.is_concept_complete(n))
        .unwrap_or(false);

    if !already_complete {
        let mut outcome = Outcome::default();
        outcome.quantifying_complete = Some(false);
        return outcome;
    }

    let current_value = in_loop_name
        .as_deref()
        .and_then(|n| repo.get(n))
        .and_then(|c| c.reference.clone())
        .map(|r| Value::Array(r.leaves()))
        .unwrap_or(Value::Null);

    if let Some(in_loop) = in_loop_name.as_deref() {
        Quantifier::record_in_loop_value(workspace, base_concept, in_loop, current_value);
    }
    let element = Quantifier::next_element(workspace, base_concept, &to_loop);
    if let Some(element) = element {
        Quantifier::record_base_element(workspace, base_concept, element);
    }

    if Quantifier::all_base_elements_processed(workspace, base_concept, &to_loop) {
        let produced = in_loop_name
            .as_deref()
            .map(|n| Quantifier::concatenated(workspace, base_concept, n))
            .unwrap_or_else(Reference::empty);
        let mut outcome = Outcome::completed(produced);
        outcome.quantifying_complete = Some(true);
        outcome
    } else {
        let mut outcome = Outcome::default();
        outcome.quantifying_complete = Some(false);
        outcome
    }
}
