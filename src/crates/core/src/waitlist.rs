//! `Waitlist` and `WaitlistItem` (§3, §4.7.6).

use crate::flow_index::FlowIndex;
use crate::inference::{InferenceEntry, InferenceRepo};

#[derive(Debug, Clone)]
pub struct WaitlistItem {
    pub flow_index: FlowIndex,
}

/// Flow-index-sorted list of items awaiting dispatch. Supports lookup of a given item's
/// descendants ("supporting items", §4.7.5).
#[derive(Debug)]
pub struct Waitlist {
    items: Vec<WaitlistItem>,
}

impl Waitlist {
    pub fn from_repo(repo: &InferenceRepo) -> Self {
        let mut items: Vec<WaitlistItem> = repo
            .all()
            .map(|e: &InferenceEntry| WaitlistItem { flow_index: e.flow_index.clone() })
            .collect();
        items.sort_by(|a, b| a.flow_index.cmp(&b.flow_index));
        Self { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitlistItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items whose flow index begins with `parent + "."` (§4.7.5).
    pub fn supporting_items(&self, parent: &FlowIndex) -> Vec<&WaitlistItem> {
        self.items
            .iter()
            .filter(|item| item.flow_index.is_descendant_of(parent))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptRepo;
    use crate::inference::{FlowInfo, InferenceRecord, SequenceKind};
    use serde_json::Value;

    fn concept_repo(names: &[&str]) -> ConceptRepo {
        let records = names
            .iter()
            .map(|n| crate::concept::ConceptRecord {
                id: n.to_string(),
                concept_name: n.to_string(),
                concept_type: crate::concept::ConceptType::Object,
                axis_name: None,
                description: None,
                reference_data: None,
                reference_axis_names: None,
                is_ground_concept: false,
                is_final_concept: false,
                is_invariant: false,
            })
            .collect();
        ConceptRepo::from_records(records).unwrap()
    }

    fn inference(flow_index: &str, concept: &str) -> InferenceRecord {
        InferenceRecord {
            id: flow_index.to_string(),
            inference_sequence: SequenceKind::Simple,
            concept_to_infer: concept.to_string(),
            function_concept: None,
            value_concepts: vec![],
            context_concepts: vec![],
            flow_info: FlowInfo { flow_index: flow_index.to_string(), support: vec![], target: vec![] },
            start_without_value: false,
            start_without_value_only_once: false,
            start_without_function: false,
            start_without_function_only_once: false,
            working_interpretation: Value::Null,
        }
    }

    #[test]
    fn supporting_items_are_dotted_descendants_only() {
        let concepts = concept_repo(&["a", "b", "c", "d"]);
        let records = vec![
            inference("1", "a"),
            inference("1.1", "b"),
            inference("1.2", "c"),
            inference("2", "d"),
        ];
        let repo = InferenceRepo::from_records(records, &concepts).unwrap();
        let waitlist = Waitlist::from_repo(&repo);
        let parent = FlowIndex::parse("1").unwrap();
        let supporters: Vec<&str> = waitlist
            .supporting_items(&parent)
            .iter()
            .map(|i| i.flow_index.as_str())
            .collect();
        assert_eq!(supporters, vec!["1.1", "1.2"]);
    }
}
