//! The grouping substrate (§4.5), used by sequence kind `grouping`.
//!
//! Grounded in the original implementation's `Grouper` class (`_grouper.py`): `and_in`
//! cross-products sliced inputs and annotates each record with labels; `or_across`
//! concatenates inputs into a flat collection, either by collapsing shared axes (legacy/shared
//! mode) or by collapsing a distinct axis list per input (per-reference mode, selected when
//! `create_axis` is paired with a `by_axes` list of per-input axis lists).

use crate::reference::{Reference, NONE_AXIS};
use serde_json::Value;
use std::collections::HashSet;

pub struct Grouper;

impl Grouper {
    fn shared_axes(refs: &[Reference]) -> Vec<String> {
        if refs.is_empty() {
            return Vec::new();
        }
        let mut shared: HashSet<&str> = refs[0].axes.iter().map(|s| s.as_str()).collect();
        for r in &refs[1..] {
            let axes: HashSet<&str> = r.axes.iter().map(|s| s.as_str()).collect();
            shared = shared.intersection(&axes).copied().collect();
        }
        shared.into_iter().map(|s| s.to_string()).collect()
    }

    /// `and_in(refs, labels, by_axes?, create_axis?)`.
    pub fn and_in(
        refs: &[Reference],
        labels: &[String],
        by_axes: Option<&[String]>,
        create_axis: Option<&str>,
    ) -> Reference {
        let shared = Self::shared_axes(refs);
        let sliced: Vec<Reference> = refs.iter().map(|r| r.slice(&shared)).collect();
        let crossed = Reference::cross_product(&sliced);
        let annotated = Self::annotate(&crossed, labels);

        let mut result = annotated;
        if let Some(by) = by_axes {
            let preserve: Vec<String> =
                result.axes.iter().filter(|a| !by.contains(a)).cloned().collect();
            result = result.slice(&preserve);
        }
        if let Some(axis) = create_axis {
            result.axes = vec![axis.to_string()]
                .into_iter()
                .chain(result.axes.into_iter().filter(|a| a != axis))
                .collect();
        } else if result.axes.is_empty() || result.axes == vec![NONE_AXIS.to_string()] {
            result.axes = vec![NONE_AXIS.to_string()];
        }
        result
    }

    fn annotate(reference: &Reference, labels: &[String]) -> Reference {
        let data = reference
            .data
            .iter()
            .map(|cell| match cell {
                Some(Value::Object(fields)) if fields.len() == labels.len() => {
                    let mut record = serde_json::Map::new();
                    for (label, (_, v)) in labels.iter().zip(fields.iter()) {
                        record.insert(label.clone(), v.clone());
                    }
                    Some(Value::Object(record))
                }
                other => other.clone(),
            })
            .collect();
        Reference { axes: reference.axes.clone(), shape: reference.shape.clone(), data }
    }

    /// `or_across(refs, by_axes?, create_axis?)`.
    pub fn or_across(
        refs: &[Reference],
        by_axes: Option<&[Vec<String>]>,
        create_axis: Option<&str>,
    ) -> Reference {
        if refs.is_empty() {
            let axis = create_axis.unwrap_or(NONE_AXIS).to_string();
            return Reference { axes: vec![axis], shape: vec![0], data: Vec::new() };
        }

        if let (Some(axis), Some(per_ref_axes)) = (create_axis, by_axes) {
            let mut elements = Vec::new();
            for (i, r) in refs.iter().enumerate() {
                let collapse = per_ref_axes.get(i).cloned().unwrap_or_else(|| r.axes.clone());
                let preserve: Vec<String> =
                    r.axes.iter().filter(|a| !collapse.contains(a)).cloned().collect();
                let sliced = if preserve.is_empty() { r.clone() } else { r.slice(&preserve) };
                elements.extend(sliced.leaves());
            }
            return Reference::from_values(elements, Some(axis.to_string()));
        }

        // Legacy/shared mode: cross-product on shared axes, optionally collapse `by_axes`,
        // then flatten to a single collection.
        let shared = Self::shared_axes(refs);
        let sliced: Vec<Reference> = refs.iter().map(|r| r.slice(&shared)).collect();
        let mut crossed = Reference::cross_product(&sliced);
        if let Some(shared_by) = by_axes.and_then(|v| v.first()) {
            let preserve: Vec<String> =
                crossed.axes.iter().filter(|a| !shared_by.contains(a)).cloned().collect();
            crossed = crossed.slice(&preserve);
        }
        let axis = create_axis.unwrap_or(NONE_AXIS).to_string();
        Reference::from_values(crossed.leaves(), Some(axis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn or_across_per_reference_concatenates_collapsed_leaves() {
        let a = Reference::from_values(vec![json!(1), json!(2)], Some("i".into()));
        let b = Reference::from_values(vec![json!(3)], Some("j".into()));
        let result = Grouper::or_across(
            &[a, b],
            Some(&[vec!["i".to_string()], vec!["j".to_string()]]),
            Some("out"),
        );
        assert_eq!(result.axes, vec!["out".to_string()]);
        assert_eq!(result.leaves(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn or_across_empty_inputs_yields_empty_reference() {
        let result = Grouper::or_across(&[], None, Some("out"));
        assert!(result.is_empty());
        assert_eq!(result.axes, vec!["out".to_string()]);
    }

    #[test]
    fn and_in_annotates_cross_product_with_labels() {
        let a = Reference::scalar(json!("x"));
        let b = Reference::scalar(json!("y"));
        let result = Grouper::and_in(&[a, b], &["left".to_string(), "right".to_string()], None, None);
        assert_eq!(result.leaves().len(), 1);
        let record = result.leaves().remove(0);
        assert_eq!(record, json!({"left": "x", "right": "y"}));
    }
}
