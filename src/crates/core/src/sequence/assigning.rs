//! `assigning` sequence kind (§4.3, §4.6). The marker and candidate order are carried in
//! `working_interpretation`: `{"marker": "specification" | "continuation"}`. Candidates are the
//! entry's value concepts, in listed order (destination-then-source priority is expressed by
//! listing the destination concept first).

use crate::assigner::{AssignMarker, Assigner};
use crate::concept::ConceptRepo;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::reference::Reference;

pub fn invoke(entry: &InferenceEntry, repo: &ConceptRepo) -> Outcome {
    let marker = match entry.working_interpretation.get("marker").and_then(|v| v.as_str()) {
        Some("continuation") => AssignMarker::Continuation,
        _ => AssignMarker::Specification,
    };

    let candidates: Vec<Reference> = entry
        .value_concepts
        .iter()
        .map(|name| repo.get(name).and_then(|c| c.reference.clone()).unwrap_or_else(Reference::empty))
        .collect();

    let output_axis = entry
        .working_interpretation
        .get("output_axis")
        .and_then(|v| v.as_str());

    let produced = Assigner::assign(marker, &candidates, output_axis);
    Outcome::completed(produced)
}
