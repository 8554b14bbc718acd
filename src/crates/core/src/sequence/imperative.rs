//! `imperative*` sequence kinds (§4.3): same external contract as `simple`, but the value is
//! produced by calling out to the `Body` (LLM/tool/script backend). The paradigm variants
//! (`imperative_python`, `imperative_python_indirect`, `imperative_in_composition`) all route
//! through the same dispatch here; the paradigm only affects what `working_interpretation`
//! means to the body, which this core never inspects.

use super::concept_leaves;
use crate::body::Body;
use crate::concept::ConceptRepo;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::reference::Reference;
use std::collections::HashMap;

pub async fn invoke(entry: &InferenceEntry, repo: &ConceptRepo, body: &dyn Body) -> Outcome {
    let mut inputs: HashMap<String, serde_json::Value> = entry
        .value_concepts
        .iter()
        .map(|name| (name.clone(), concept_leaves(repo, name)))
        .collect();
    for name in &entry.context_concepts {
        inputs.insert(name.clone(), concept_leaves(repo, name));
    }

    let verb = entry.function_concept.as_deref().unwrap_or(&entry.concept_to_infer);
    match body.invoke(verb, &inputs).await {
        Ok(value) => Outcome::completed(Reference::from_json(value, None)),
        Err(message) => Outcome::pending_retry(message),
    }
}
