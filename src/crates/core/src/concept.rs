//! `Concept` and `ConceptRepo` (§3 "Concept", §4.1).

use crate::error::{FlowboardError, Result};
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The finite set of concept type tags. The core treats these as opaque — it never branches
/// on them except to carry them through the checkpoint signature comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConceptType {
    #[serde(rename = "{}")]
    Object,
    #[serde(rename = "::")]
    Function,
    #[serde(rename = "&")]
    Grouping,
    #[serde(rename = "*")]
    Quantifying,
    #[serde(rename = "$")]
    Assigning,
    #[serde(rename = "@")]
    Timing,
    #[serde(rename = "?")]
    Query,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub id: String,
    pub concept_name: String,
    #[serde(rename = "type")]
    pub concept_type: ConceptType,
    pub axis_name: Option<String>,
    pub description: Option<String>,
    pub reference_data: Option<Value>,
    pub reference_axis_names: Option<Vec<String>>,
    #[serde(default)]
    pub is_ground_concept: bool,
    #[serde(default)]
    pub is_final_concept: bool,
    #[serde(default)]
    pub is_invariant: bool,
}

/// A typed data cell. `reference` starts `None` for non-ground concepts and is attached by
/// the producing inference, seeded at construction for ground concepts, or cleared by the
/// quantifying reset protocol.
#[derive(Debug, Clone)]
pub struct Concept {
    pub id: String,
    pub name: String,
    pub concept_type: ConceptType,
    pub context: Option<String>,
    pub axis_name: Option<String>,
    pub reference: Option<Reference>,
    pub is_ground_concept: bool,
    pub is_final_concept: bool,
    pub is_invariant: bool,
}

impl Concept {
    fn from_record(record: ConceptRecord) -> Self {
        let reference = record.reference_data.map(|data| {
            Reference::from_json(data, record.reference_axis_names.clone())
        });
        Self {
            id: record.id,
            name: record.concept_name,
            concept_type: record.concept_type,
            context: record.description,
            axis_name: record.axis_name,
            reference,
            is_ground_concept: record.is_ground_concept,
            is_final_concept: record.is_final_concept,
            is_invariant: record.is_invariant,
        }
    }
}

/// Keyed store of `Concept` records (§4.1). Construction enforces unique names.
#[derive(Debug, Default)]
pub struct ConceptRepo {
    concepts: HashMap<String, Concept>,
    order: Vec<String>,
}

impl ConceptRepo {
    pub fn from_records(records: Vec<ConceptRecord>) -> Result<Self> {
        let mut concepts = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        for record in records {
            let concept = Concept::from_record(record);
            if concepts.contains_key(&concept.name) {
                return Err(FlowboardError::DuplicateConcept(concept.name));
            }
            order.push(concept.name.clone());
            concepts.insert(concept.name.clone(), concept);
        }
        Ok(Self { concepts, order })
    }

    pub fn get(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Concept> {
        self.concepts.get_mut(name)
    }

    /// Attach a Reference built from `data` (list-wrap if scalar), replacing whatever was
    /// there before.
    pub fn add_reference(&mut self, name: &str, data: Value, axes: Option<Vec<String>>) -> Result<()> {
        let concept = self
            .concepts
            .get_mut(name)
            .ok_or_else(|| FlowboardError::UnknownConcept {
                flow_index: String::new(),
                concept: name.to_string(),
            })?;
        concept.reference = Some(Reference::from_json(data, axes));
        Ok(())
    }

    pub fn all(&self) -> impl Iterator<Item = &Concept> {
        self.order.iter().filter_map(|n| self.concepts.get(n))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn final_concepts(&self) -> Vec<&Concept> {
        self.all().filter(|c| c.is_final_concept).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ConceptRecord {
        ConceptRecord {
            id: name.to_string(),
            concept_name: name.to_string(),
            concept_type: ConceptType::Object,
            axis_name: None,
            description: None,
            reference_data: None,
            reference_axis_names: None,
            is_ground_concept: false,
            is_final_concept: false,
            is_invariant: false,
        }
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let err = ConceptRepo::from_records(vec![record("a"), record("a")]).unwrap_err();
        assert!(matches!(err, FlowboardError::DuplicateConcept(_)));
    }

    #[test]
    fn add_reference_list_wraps_scalar() {
        let mut repo = ConceptRepo::from_records(vec![record("a")]).unwrap();
        repo.add_reference("a", serde_json::json!(5), None).unwrap();
        assert_eq!(repo.get("a").unwrap().reference.as_ref().unwrap().shape, vec![1]);
    }
}
