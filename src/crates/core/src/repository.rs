//! Repository file loading (§6.1): `concepts.json`, `inferences.json`, and the optional
//! `inputs.json` overlay. Mirrors pcastone-orca's `YamlGraphDef::from_file` convention —
//! read the file, deserialize, wrap I/O and parse failures with path context at the origin site.

use crate::concept::{ConceptRecord, ConceptRepo};
use crate::error::{FlowboardError, Result};
use crate::inference::InferenceRecord;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputEntry {
    Literal(Value),
    WithAxes { data: Value, axes: Option<Vec<String>> },
}

fn read_json(path: &Path) -> Result<Value> {
    let path_str = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| FlowboardError::RepoIo {
        path: path_str.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| FlowboardError::RepoParse { path: path_str, source })
}

pub fn load_concepts(path: &Path) -> Result<Vec<ConceptRecord>> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| FlowboardError::RepoParse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_inferences(path: &Path) -> Result<Vec<InferenceRecord>> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| FlowboardError::RepoParse {
        path: path.display().to_string(),
        source,
    })
}

/// Load and apply an `inputs.json` overlay onto an already-constructed `ConceptRepo`
/// (§6.1 "loaded by `concept_repo.add_reference`").
pub fn apply_inputs(repo: &mut ConceptRepo, path: &Path) -> Result<()> {
    let value = read_json(path)?;
    let entries: HashMap<String, InputEntry> =
        serde_json::from_value(value).map_err(|source| FlowboardError::RepoParse {
            path: path.display().to_string(),
            source,
        })?;
    for (name, entry) in entries {
        let (data, axes) = match entry {
            InputEntry::Literal(data) => (data, None),
            InputEntry::WithAxes { data, axes } => (data, axes),
        };
        repo.add_reference(&name, data, axes)?;
    }
    Ok(())
}
