//! The assigner substrate (§4.6), used by sequence kind `assigning`.
//!
//! Two markers: `specification` picks the first non-empty candidate from a priority-ordered
//! list (first-non-empty-wins); `continuation` concatenates every candidate's leaves in order,
//! skipping the `None` sentinel cells (§9 design note on the skip sentinel).

use crate::reference::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignMarker {
    Specification,
    Continuation,
}

pub struct Assigner;

impl Assigner {
    pub fn assign(marker: AssignMarker, candidates: &[Reference], output_axis: Option<&str>) -> Reference {
        match marker {
            AssignMarker::Specification => Self::specification(candidates),
            AssignMarker::Continuation => Self::continuation(candidates, output_axis),
        }
    }

    /// First candidate with at least one non-skip leaf wins, as-is.
    fn specification(candidates: &[Reference]) -> Reference {
        for candidate in candidates {
            if candidate.leaves().into_iter().any(|v| !v.is_null()) {
                return candidate.clone();
            }
        }
        candidates.first().cloned().unwrap_or_else(Reference::empty)
    }

    /// Concatenate leaves of every candidate, in order, dropping skip cells.
    fn continuation(candidates: &[Reference], output_axis: Option<&str>) -> Reference {
        let mut values = Vec::new();
        for candidate in candidates {
            values.extend(candidate.leaves().into_iter().filter(|v| !v.is_null()));
        }
        Reference::from_values(values, output_axis.map(|a| a.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn specification_returns_first_non_empty() {
        let empty = Reference::empty();
        let second = Reference::scalar(json!("picked"));
        let third = Reference::scalar(json!("ignored"));
        let result = Assigner::assign(AssignMarker::Specification, &[empty, second, third], None);
        assert_eq!(result.leaves(), vec![json!("picked")]);
    }

    #[test]
    fn specification_all_empty_falls_back_to_first() {
        let a = Reference::empty();
        let b = Reference::empty();
        let result = Assigner::assign(AssignMarker::Specification, &[a, b], None);
        assert!(result.is_empty());
    }

    #[test]
    fn continuation_concatenates_and_skips_nulls() {
        let a = Reference::from_values(vec![json!(1), Value::Null], Some("x".into()));
        let b = Reference::from_values(vec![json!(2)], Some("x".into()));
        let result = Assigner::assign(AssignMarker::Continuation, &[a, b], Some("out"));
        assert_eq!(result.axes, vec!["out".to_string()]);
        assert_eq!(result.leaves(), vec![json!(1), json!(2)]);
    }
}
