//! The free-form `Workspace` scratch map (§3 "Workspace").
//!
//! Used by quantifying inferences to stash per-iteration bookkeeping that must survive
//! between scheduler cycles without entering the Blackboard's concept namespace. Reads and
//! writes are serialized by the single-threaded scheduler (§5).

use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct Workspace {
    entries: HashMap<String, Value>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn entry(&mut self, key: impl Into<String>) -> &mut Value {
        self.entries.entry(key.into()).or_insert(Value::Null)
    }

    /// Serialize by value, as stored verbatim in a checkpoint (§4.8.1).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.entries).unwrap_or(Value::Null)
    }

    pub fn from_value(value: Value) -> Self {
        let entries = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self { entries }
    }
}
