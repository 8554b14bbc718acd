//! `judgement*` sequence kinds (§4.3): same dispatch as `imperative`, but the produced
//! Reference is coerced to a boolean verdict, optionally against a configured `condition` in
//! `working_interpretation` (`{"condition": "truthy" | "equals", "expected": <value>}`).

use super::concept_leaves;
use crate::body::Body;
use crate::concept::ConceptRepo;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::reference::Reference;
use serde_json::Value;
use std::collections::HashMap;

pub async fn invoke(entry: &InferenceEntry, repo: &ConceptRepo, body: &dyn Body) -> Outcome {
    let mut inputs: HashMap<String, Value> = entry
        .value_concepts
        .iter()
        .map(|name| (name.clone(), concept_leaves(repo, name)))
        .collect();
    for name in &entry.context_concepts {
        inputs.insert(name.clone(), concept_leaves(repo, name));
    }

    let verb = entry.function_concept.as_deref().unwrap_or(&entry.concept_to_infer);
    let raw = match body.invoke(verb, &inputs).await {
        Ok(value) => value,
        Err(message) => return Outcome::pending_retry(message),
    };

    let verdict = match entry.working_interpretation.get("condition").and_then(Value::as_str) {
        Some("equals") => {
            let expected = entry.working_interpretation.get("expected").cloned().unwrap_or(Value::Null);
            raw == expected
        }
        _ => is_truthy(&raw),
    };

    Outcome::completed(Reference::scalar(Value::Bool(verdict)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
