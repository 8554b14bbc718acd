//! `simple` sequence kind (§4.3): read value concepts, produce one Reference.

use crate::concept::ConceptRepo;
use crate::inference::InferenceEntry;
use crate::outcome::Outcome;
use crate::reference::Reference;

pub fn invoke(entry: &InferenceEntry, repo: &ConceptRepo) -> Outcome {
    let refs: Vec<Reference> = entry
        .value_concepts
        .iter()
        .filter_map(|name| repo.get(name).and_then(|c| c.reference.clone()))
        .collect();

    let produced = match refs.len() {
        0 => Reference::empty(),
        1 => refs.into_iter().next().unwrap(),
        _ => Reference::cross_product(&refs),
    };
    Outcome::completed(produced)
}
