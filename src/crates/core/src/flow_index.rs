//! Dotted-numeric flow indices (§3 `InferenceEntry`, §9 "Flow-index parsing").
//!
//! Parsed into a tuple of integers exactly once at construction; the core never
//! string-compares a flow index again after that.

use crate::error::{FlowboardError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct FlowIndex {
    raw: String,
    segments: Vec<u64>,
}

impl FlowIndex {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(FlowboardError::MalformedFlowIndex(raw.to_string()));
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let n: u64 = part
                .parse()
                .map_err(|_| FlowboardError::MalformedFlowIndex(raw.to_string()))?;
            segments.push(n);
        }
        Ok(Self { raw: raw.to_string(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True if `self` is a descendant of `other`, i.e. `self`'s segments begin with all of
    /// `other`'s segments and `self` has strictly more segments ("supporting item", §4.7.5).
    pub fn is_descendant_of(&self, other: &FlowIndex) -> bool {
        self.segments.len() > other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }
}

impl fmt::Display for FlowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialOrd for FlowIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlowIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_lexicographically_by_integer_segments() {
        let mut indices: Vec<FlowIndex> = ["1.10", "1.2", "1.1", "2", "1"]
            .iter()
            .map(|s| FlowIndex::parse(s).unwrap())
            .collect();
        indices.sort();
        let sorted: Vec<&str> = indices.iter().map(|f| f.as_str()).collect();
        assert_eq!(sorted, vec!["1", "1.1", "1.2", "1.10", "2"]);
    }

    #[test]
    fn descendant_requires_dotted_prefix() {
        let parent = FlowIndex::parse("1.1").unwrap();
        let child = FlowIndex::parse("1.1.2").unwrap();
        let sibling = FlowIndex::parse("1.2").unwrap();
        let same = FlowIndex::parse("1.1").unwrap();
        assert!(child.is_descendant_of(&parent));
        assert!(!sibling.is_descendant_of(&parent));
        assert!(!same.is_descendant_of(&parent));
    }

    #[test]
    fn rejects_malformed_index() {
        assert!(FlowIndex::parse("1.a").is_err());
        assert!(FlowIndex::parse("").is_err());
    }
}
