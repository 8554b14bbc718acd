//! `timing` sequence kind (§4.3, §4.7.4): pure predicate over the Blackboard, never mutates a
//! concept. The gating concept is the item's single function concept, by convention.

use crate::blackboard::Blackboard;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;

pub fn invoke(entry: &InferenceEntry, blackboard: &Blackboard) -> Outcome {
    let gate = entry
        .function_concept
        .as_deref()
        .or_else(|| entry.value_concepts.first().map(String::as_str));

    let timing_ready = match gate {
        Some(name) => blackboard.is_concept_complete(name),
        None => true,
    };

    Outcome { timing_ready, ..Default::default() }
}
