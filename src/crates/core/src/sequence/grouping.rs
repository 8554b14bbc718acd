//! `grouping` sequence kind (§4.3, §4.5). `working_interpretation` selects the operation and its
//! parameters:
//! `{"op": "and_in", "labels": [...], "by_axes": [...]?, "create_axis": "..."?}` or
//! `{"op": "or_across", "by_axes": [[...], ...]?, "create_axis": "..."?}`.

use crate::concept::ConceptRepo;
use crate::grouper::Grouper;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::reference::Reference;
use serde_json::Value;

pub fn invoke(entry: &InferenceEntry, repo: &ConceptRepo) -> Outcome {
    let refs: Vec<Reference> = entry
        .value_concepts
        .iter()
        .map(|name| repo.get(name).and_then(|c| c.reference.clone()).unwrap_or_else(Reference::empty))
        .collect();

    let wi = &entry.working_interpretation;
    let create_axis = wi.get("create_axis").and_then(Value::as_str);
    let op = wi.get("op").and_then(Value::as_str).unwrap_or("and_in");

    let produced = match op {
        "or_across" => {
            let by_axes: Option<Vec<Vec<String>>> = wi.get("by_axes").and_then(|v| {
                serde_json::from_value::<Vec<Vec<String>>>(v.clone()).ok()
            });
            Grouper::or_across(&refs, by_axes.as_deref(), create_axis)
        }
        _ => {
            let labels: Vec<String> = wi
                .get("labels")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(|| entry.value_concepts.clone());
            let by_axes: Option<Vec<String>> = wi
                .get("by_axes")
                .and_then(|v| serde_json::from_value(v.clone()).ok());
            Grouper::and_in(&refs, &labels, by_axes.as_deref(), create_axis)
        }
    };

    Outcome::completed(produced)
}
