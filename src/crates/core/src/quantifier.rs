//! The quantifying-loop substrate (§4.4), used by sequence kind `quantifying`.
//!
//! A pure module over the orchestrator's `Workspace`: all state lives in workspace entries
//! keyed by the loop's base concept name, so the quantifying sequence kind (in
//! `sequence::quantifying`) can drive it without the scheduler knowing anything about loop
//! internals.

use crate::reference::Reference;
use crate::workspace::Workspace;
use serde_json::{json, Value};

fn state_key(base_concept: &str) -> String {
    format!("__quantifier__{base_concept}")
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct LoopState {
    /// Base elements recorded so far, in processing order.
    processed: Vec<Value>,
    /// In-loop concept values recorded per iteration: concept name -> values by loop index.
    in_loop: std::collections::HashMap<String, Vec<Value>>,
}

pub struct Quantifier;

impl Quantifier {
    fn load(workspace: &Workspace, base_concept: &str) -> LoopState {
        workspace
            .get(&state_key(base_concept))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    fn save(workspace: &mut Workspace, base_concept: &str, state: &LoopState) {
        workspace.set(state_key(base_concept), serde_json::to_value(state).unwrap_or(json!({})));
    }

    /// The next unprocessed element of `to_loop`, following column-major iteration order
    /// (§4.4 "Ordering"). Returns `None` once every element has been consumed.
    pub fn next_element(workspace: &Workspace, base_concept: &str, to_loop: &Reference) -> Option<Value> {
        let state = Self::load(workspace, base_concept);
        let elements = to_loop.base_elements();
        elements.into_iter().nth(state.processed.len())
    }

    /// Record a newly processed base element under the loop's monotonic index.
    pub fn record_base_element(workspace: &mut Workspace, base_concept: &str, element: Value) -> usize {
        let mut state = Self::load(workspace, base_concept);
        let index = state.processed.len();
        state.processed.push(element);
        Self::save(workspace, base_concept, &state);
        index
    }

    /// Record an in-loop concept's value for the current iteration index.
    pub fn record_in_loop_value(workspace: &mut Workspace, base_concept: &str, concept: &str, value: Value) {
        let mut state = Self::load(workspace, base_concept);
        state.in_loop.entry(concept.to_string()).or_default().push(value);
        Self::save(workspace, base_concept, &state);
    }

    /// Retrieve an in-loop concept value from `k` steps back (carry semantics). `k == 0` is
    /// the most recently recorded value.
    pub fn carry(workspace: &Workspace, base_concept: &str, concept: &str, k: usize) -> Option<Value> {
        let state = Self::load(workspace, base_concept);
        let values = state.in_loop.get(concept)?;
        let idx = values.len().checked_sub(1 + k)?;
        values.get(idx).cloned()
    }

    /// Concatenate all per-iteration outputs of `concept` into a Reference aligned on the
    /// base-element axis.
    pub fn concatenated(workspace: &Workspace, base_concept: &str, concept: &str) -> Reference {
        let state = Self::load(workspace, base_concept);
        let values = state.in_loop.get(concept).cloned().unwrap_or_default();
        Reference::from_values(values, Some(base_concept.to_string()))
    }

    /// Whether every element of `to_loop` has been associated with a completed iteration.
    pub fn all_base_elements_processed(workspace: &Workspace, base_concept: &str, to_loop: &Reference) -> bool {
        let state = Self::load(workspace, base_concept);
        state.processed.len() >= to_loop.base_elements().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_loop_is_immediately_complete() {
        let workspace = Workspace::new();
        let empty = Reference::empty();
        assert!(Quantifier::all_base_elements_processed(&workspace, "base", &empty));
        assert!(Quantifier::next_element(&workspace, "base", &empty).is_none());
    }

    #[test]
    fn processes_elements_in_order_and_tracks_completion() {
        let mut workspace = Workspace::new();
        let to_loop = Reference::from_values(
            vec![json!("A"), json!("B"), json!("C")],
            Some("base".into()),
        );
        assert_eq!(Quantifier::next_element(&workspace, "base", &to_loop), Some(json!("A")));
        Quantifier::record_base_element(&mut workspace, "base", json!("A"));
        assert!(!Quantifier::all_base_elements_processed(&workspace, "base", &to_loop));
        assert_eq!(Quantifier::next_element(&workspace, "base", &to_loop), Some(json!("B")));
        Quantifier::record_base_element(&mut workspace, "base", json!("B"));
        Quantifier::record_base_element(&mut workspace, "base", json!("C"));
        assert!(Quantifier::all_base_elements_processed(&workspace, "base", &to_loop));
    }

    #[test]
    fn carry_retrieves_k_steps_back() {
        let mut workspace = Workspace::new();
        Quantifier::record_in_loop_value(&mut workspace, "base", "digit", json!(1));
        Quantifier::record_in_loop_value(&mut workspace, "base", "digit", json!(2));
        Quantifier::record_in_loop_value(&mut workspace, "base", "digit", json!(3));
        assert_eq!(Quantifier::carry(&workspace, "base", "digit", 0), Some(json!(3)));
        assert_eq!(Quantifier::carry(&workspace, "base", "digit", 1), Some(json!(2)));
        assert_eq!(Quantifier::carry(&workspace, "base", "digit", 5), None);
    }

    #[test]
    fn concatenated_aligns_on_base_axis() {
        let mut workspace = Workspace::new();
        Quantifier::record_in_loop_value(&mut workspace, "base", "digit", json!(1));
        Quantifier::record_in_loop_value(&mut workspace, "base", "digit", json!(2));
        let result = Quantifier::concatenated(&workspace, "base", "digit");
        assert_eq!(result.axes, vec!["base".to_string()]);
        assert_eq!(result.leaves(), vec![json!(1), json!(2)]);
    }
}
