//! `InferenceEntry`, `SequenceKind`, and `InferenceRepo` (§3, §4.2, §4.3).

use crate::concept::ConceptRepo;
use crate::error::{FlowboardError, Result};
use crate::flow_index::FlowIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Simple,
    Imperative,
    ImperativePython,
    ImperativePythonIndirect,
    ImperativeInComposition,
    Judgement,
    JudgementPython,
    JudgementInComposition,
    Grouping,
    Quantifying,
    Assigning,
    Timing,
}

impl SequenceKind {
    /// `imperative*` variants behave identically from the scheduler's perspective; likewise
    /// for the `judgement*` family (§4.3).
    pub fn is_imperative_family(self) -> bool {
        matches!(
            self,
            SequenceKind::Imperative
                | SequenceKind::ImperativePython
                | SequenceKind::ImperativePythonIndirect
                | SequenceKind::ImperativeInComposition
        )
    }

    pub fn is_judgement_family(self) -> bool {
        matches!(
            self,
            SequenceKind::Judgement | SequenceKind::JudgementPython | SequenceKind::JudgementInComposition
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowInfo {
    pub flow_index: String,
    #[serde(default)]
    pub support: Vec<String>,
    #[serde(default)]
    pub target: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub id: String,
    pub inference_sequence: SequenceKind,
    pub concept_to_infer: String,
    pub function_concept: Option<String>,
    #[serde(default)]
    pub value_concepts: Vec<String>,
    #[serde(default)]
    pub context_concepts: Vec<String>,
    pub flow_info: FlowInfo,
    #[serde(default)]
    pub start_without_value: bool,
    #[serde(default)]
    pub start_without_value_only_once: bool,
    #[serde(default)]
    pub start_without_function: bool,
    #[serde(default)]
    pub start_without_function_only_once: bool,
    #[serde(default)]
    pub working_interpretation: Value,
}

#[derive(Debug, Clone)]
pub struct InferenceEntry {
    pub id: String,
    pub inference_sequence: SequenceKind,
    pub concept_to_infer: String,
    pub function_concept: Option<String>,
    pub value_concepts: Vec<String>,
    pub context_concepts: Vec<String>,
    pub flow_index: FlowIndex,
    pub start_without_value: bool,
    pub start_without_value_only_once: bool,
    pub start_without_function: bool,
    pub start_without_function_only_once: bool,
    pub working_interpretation: Value,
}

impl InferenceEntry {
    fn from_record(record: InferenceRecord) -> Result<Self> {
        let flow_index = FlowIndex::parse(&record.flow_info.flow_index)?;
        Ok(Self {
            id: record.id,
            inference_sequence: record.inference_sequence,
            concept_to_infer: record.concept_to_infer,
            function_concept: record.function_concept,
            value_concepts: record.value_concepts,
            context_concepts: record.context_concepts,
            flow_index,
            start_without_value: record.start_without_value,
            start_without_value_only_once: record.start_without_value_only_once,
            start_without_function: record.start_without_function,
            start_without_function_only_once: record.start_without_function_only_once,
            working_interpretation: record.working_interpretation,
        })
    }
}

/// Keyed store of `InferenceEntry` records (§4.2). Construction resolves every named concept
/// reference against a `ConceptRepo`; unknown names are fatal.
#[derive(Debug, Default)]
pub struct InferenceRepo {
    by_flow_index: HashMap<String, InferenceEntry>,
    order: Vec<String>,
}

impl InferenceRepo {
    pub fn from_records(records: Vec<InferenceRecord>, concepts: &ConceptRepo) -> Result<Self> {
        let mut by_flow_index = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        for record in records {
            let entry = InferenceEntry::from_record(record)?;
            let flow_index = entry.flow_index.as_str().to_string();

            let mut check = |name: &str| -> Result<()> {
                if concepts.contains(name) {
                    Ok(())
                } else {
                    Err(FlowboardError::UnknownConcept {
                        flow_index: flow_index.clone(),
                        concept: name.to_string(),
                    })
                }
            };
            check(&entry.concept_to_infer)?;
            if let Some(f) = &entry.function_concept {
                check(f)?;
            }
            for v in &entry.value_concepts {
                check(v)?;
            }
            for c in &entry.context_concepts {
                check(c)?;
            }

            order.push(flow_index.clone());
            by_flow_index.insert(flow_index, entry);
        }
        order.sort_by(|a, b| {
            FlowIndex::parse(a).unwrap().cmp(&FlowIndex::parse(b).unwrap())
        });
        Ok(Self { by_flow_index, order })
    }

    pub fn get_by_flow_index(&self, flow_index: &str) -> Option<&InferenceEntry> {
        self.by_flow_index.get(flow_index)
    }

    pub fn all(&self) -> impl Iterator<Item = &InferenceEntry> {
        self.order.iter().filter_map(|f| self.by_flow_index.get(f))
    }

    pub fn len(&self) -> usize {
        self.by_flow_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_flow_index.is_empty()
    }

    /// "Primitive functions": concepts used as a `function_concept` of some entry that are not
    /// the `concept_to_infer` of any entry (§4.7.1 step 3).
    pub fn primitive_function_concepts(&self) -> Vec<String> {
        let produced: std::collections::HashSet<&str> =
            self.all().map(|e| e.concept_to_infer.as_str()).collect();
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for entry in self.all() {
            if let Some(f) = &entry.function_concept {
                if !produced.contains(f.as_str()) && seen.insert(f.clone()) {
                    result.push(f.clone());
                }
            }
        }
        result
    }
}
