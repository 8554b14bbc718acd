//! The tensor-valued `Reference` cell (§3 "Reference (tensor cell)").
//!
//! A `Reference` is a rectangular, axis-named tensor of opaque scalars. The scheduler treats
//! it as an opaque payload; only the `Grouper`/`Quantifier`/`Assigner` substrates and the
//! checkpoint reconcile signature comparison look inside it.
//!
//! Empty slots are a typed `None` cell rather than the source's magic string sentinel
//! (`"@#SKIP#@"`); see the flow-index/skip-sentinel notes in SPEC_FULL.md §9.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NONE_AXIS: &str = "_none_axis";

/// One cell of a `Reference`. `None` is the skip sentinel.
pub type Cell = Option<Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub axes: Vec<String>,
    pub shape: Vec<usize>,
    pub data: Vec<Cell>,
}

impl Reference {
    pub fn new(axes: Vec<String>, shape: Vec<usize>, data: Vec<Cell>) -> Self {
        debug_assert_eq!(axes.len(), shape.len());
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { axes, shape, data }
    }

    /// An empty reference on a single sentinel axis (produced by `or_across` with no inputs,
    /// and by the quantifying reset protocol clearing a concept).
    pub fn empty() -> Self {
        Self {
            axes: vec![NONE_AXIS.to_string()],
            shape: vec![0],
            data: Vec::new(),
        }
    }

    /// Wrap a single scalar value in a length-1 `_none_axis` reference.
    pub fn scalar(value: Value) -> Self {
        Self {
            axes: vec![NONE_AXIS.to_string()],
            shape: vec![1],
            data: vec![Some(value)],
        }
    }

    /// Build a reference from a flat list of values along one named axis (defaults to
    /// `_none_axis`). Used by `ConceptRepo::add_reference` when given a JSON array.
    pub fn from_values(values: Vec<Value>, axis_name: Option<String>) -> Self {
        let n = values.len();
        Self {
            axes: vec![axis_name.unwrap_or_else(|| NONE_AXIS.to_string())],
            shape: vec![n],
            data: values.into_iter().map(Some).collect(),
        }
    }

    /// List-wrap a scalar or pass through a list/object as-is (per §4.1 `add_reference`:
    /// "attach a Reference built from data (list-wrap if scalar)").
    pub fn from_json(data: Value, axes: Option<Vec<String>>) -> Self {
        match data {
            Value::Array(items) => {
                let axis_name = axes.and_then(|mut a| if a.is_empty() { None } else { Some(a.remove(0)) });
                Self::from_values(items, axis_name)
            }
            other => Self::scalar(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.data.iter().all(|c| c.is_none())
    }

    /// `(axes, shape)` — the signature compared during checkpoint reconcile (§4.8.2). The
    /// concept's `type` tag is compared alongside this by the caller.
    pub fn signature(&self) -> (Vec<String>, Vec<usize>) {
        (self.axes.clone(), self.shape.clone())
    }

    /// Flattened leaves in storage order, skip sentinels filtered.
    pub fn leaves(&self) -> Vec<Value> {
        self.data.iter().filter_map(|c| c.clone()).collect()
    }

    /// Column-major iteration order for quantifying-loop base elements: since `data` is stored
    /// row-major, a single-axis reference's natural order already matches column-major.
    /// Duplicates are preserved, skip sentinels are filtered (§4.4 Ordering).
    pub fn base_elements(&self) -> Vec<Value> {
        self.leaves()
    }

    /// Project onto a subset of axes. Axes dropped are assumed to have already been made
    /// uniform (the caller collapses/cross-products before calling); this is the degenerate
    /// single-slab projection used by the Grouper when an axis is fully collapsed.
    pub fn slice(&self, keep_axes: &[String]) -> Reference {
        if keep_axes.iter().collect::<std::collections::HashSet<_>>()
            == self.axes.iter().collect::<std::collections::HashSet<_>>()
        {
            return self.clone();
        }
        let keep_idx: Vec<usize> = keep_axes
            .iter()
            .filter_map(|a| self.axes.iter().position(|x| x == a))
            .collect();
        if keep_idx.is_empty() {
            return Reference {
                axes: vec![NONE_AXIS.to_string()],
                shape: vec![1],
                data: self.data.first().cloned().into_iter().collect(),
            };
        }
        let new_axes: Vec<String> = keep_idx.iter().map(|&i| self.axes[i].clone()).collect();
        let new_shape: Vec<usize> = keep_idx.iter().map(|&i| self.shape[i]).collect();
        let strides = row_major_strides(&self.shape);
        let total: usize = new_shape.iter().product();
        let mut data = Vec::with_capacity(total);
        for flat in 0..total {
            let coords = unflatten(flat, &new_shape);
            let mut full_flat = 0usize;
            for (pos, &axis_i) in keep_idx.iter().enumerate() {
                full_flat += coords[pos] * strides[axis_i];
            }
            data.push(self.data.get(full_flat).cloned().flatten());
        }
        Reference { axes: new_axes, shape: new_shape, data }
    }

    /// Cartesian (cross) product over a set of references whose axes are otherwise disjoint.
    /// Shared axes (same name present in more than one input) are required to have matching
    /// size and are walked in lock-step rather than multiplied.
    pub fn cross_product(refs: &[Reference]) -> Reference {
        if refs.is_empty() {
            return Reference::empty();
        }
        if refs.len() == 1 {
            return refs[0].clone();
        }
        let mut axes: Vec<String> = Vec::new();
        let mut shape: Vec<usize> = Vec::new();
        for r in refs {
            for (i, a) in r.axes.iter().enumerate() {
                if !axes.contains(a) {
                    axes.push(a.clone());
                    shape.push(r.shape[i]);
                }
            }
        }
        let total: usize = shape.iter().product();
        let mut data = Vec::with_capacity(total);
        for flat in 0..total {
            let coords = unflatten(flat, &shape);
            let mut record = serde_json::Map::new();
            let mut any_skip = false;
            for r in refs {
                let r_coords: Vec<usize> = r
                    .axes
                    .iter()
                    .map(|a| coords[axes.iter().position(|x| x == a).unwrap()] % r.shape[axes_index(&axes, a)])
                    .collect();
                let r_flat = flatten(&r_coords, &r.shape);
                match r.data.get(r_flat).cloned().flatten() {
                    Some(v) => {
                        record.insert(format!("_ref{}", refs.iter().position(|x| std::ptr::eq(x, r)).unwrap_or(0)), v);
                    }
                    None => any_skip = true,
                }
            }
            if any_skip && record.is_empty() {
                data.push(None);
            } else {
                data.push(Some(Value::Object(record)));
            }
        }
        Reference { axes, shape, data }
    }
}

fn axes_index(axes: &[String], name: &str) -> usize {
    axes.iter().position(|x| x == name).unwrap()
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn unflatten(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let strides = row_major_strides(shape);
    let mut coords = vec![0usize; shape.len()];
    for (i, &s) in strides.iter().enumerate() {
        coords[i] = if s == 0 { 0 } else { flat / s };
        flat %= s.max(1);
    }
    coords
}

fn flatten(coords: &[usize], shape: &[usize]) -> usize {
    let strides = row_major_strides(shape);
    coords.iter().zip(strides.iter()).map(|(c, s)| c * s).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_wraps_into_single_cell() {
        let r = Reference::scalar(json!(42));
        assert_eq!(r.shape, vec![1]);
        assert_eq!(r.leaves(), vec![json!(42)]);
    }

    #[test]
    fn from_json_list_wraps_scalars() {
        let r = Reference::from_json(json!([1, 2, 3]), None);
        assert_eq!(r.shape, vec![3]);
        assert_eq!(r.leaves(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn empty_reference_has_no_leaves() {
        assert!(Reference::empty().is_empty());
        assert!(Reference::empty().leaves().is_empty());
    }

    #[test]
    fn base_elements_preserve_order_and_filter_skips() {
        let r = Reference {
            axes: vec!["i".into()],
            shape: vec![3],
            data: vec![Some(json!("A")), None, Some(json!("C"))],
        };
        assert_eq!(r.base_elements(), vec![json!("A"), json!("C")]);
    }

    #[test]
    fn signature_tracks_axes_and_shape() {
        let r = Reference::from_values(vec![json!(1), json!(2)], Some("x".into()));
        assert_eq!(r.signature(), (vec!["x".to_string()], vec![2]));
    }
}
