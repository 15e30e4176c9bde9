//! Obstruction values on segments and the derived-attribute pre-pass.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{ArterialTree, EdgeId};
use crate::domain::error::{DomainError, DomainResult};

pub const TRANSVERSAL_OBSTRUCTION: &str = "transversal_obstruction";
pub const MAX_TRANSVERSAL_OBSTRUCTION: &str = "max_transversal_obstruction";
pub const MAX_TRANSVERSAL_OBSTRUCTION_PROPAGATED: &str = "max_transversal_obstruction_propagated";
pub const MAX_TRANSVERSAL_OBSTRUCTION_CUMULATED: &str = "max_transversal_obstruction_cumulated";

/// Propagated value: worst obstruction seen on the path from the root.
pub fn propagate(parent: f64, own: f64) -> f64 {
    parent.max(own)
}

/// Cumulated value: probabilistic union of obstructions along the path.
pub fn cumulate(parent: f64, own: f64) -> f64 {
    1.0 - (1.0 - parent) * (1.0 - own)
}

impl ArterialTree {
    /// Obstruction value named `attribute` on `edge`.
    ///
    /// A scalar attribute wins; otherwise the maximum of a non-empty series of the same
    /// name is used. Values must be finite and within [0, 1].
    pub fn obstruction(&self, edge: EdgeId, attribute: &str) -> DomainResult<f64> {
        let node = self
            .get_node(edge)
            .ok_or_else(|| DomainError::MalformedTree(format!("unknown edge index {edge:?}")))?;
        let value = node
            .segment
            .attributes
            .get(attribute)
            .copied()
            .or_else(|| series_max(node.segment.series.get(attribute)))
            .ok_or_else(|| DomainError::AttributeMissing {
                location: format!("edge {}", self.edge_label(edge)),
                attribute: attribute.to_string(),
            })?;
        check_range(self, edge, attribute, value)
    }
}

fn series_max(series: Option<&Vec<f64>>) -> Option<f64> {
    series?.iter().copied().reduce(f64::max)
}

fn check_range(tree: &ArterialTree, edge: EdgeId, attribute: &str, value: f64) -> DomainResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::ObstructionOutOfRange {
            edge: tree.edge_label(edge),
            attribute: attribute.to_string(),
            value,
        })
    }
}

/// Attribute names used by [`derive_obstruction_attributes`].
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedAttributes {
    /// Raw per-segment measurements (series or scalar)
    pub input_attr: String,
    /// Output: the segment's own maximum obstruction
    pub max_attr: String,
    /// Output: max along the path from the root
    pub propagated_attr: String,
    /// Output: probabilistic union along the path from the root
    pub cumulated_attr: String,
    /// Value assumed above the root
    pub root_obstruction: f64,
}

impl Default for DerivedAttributes {
    fn default() -> Self {
        Self {
            input_attr: TRANSVERSAL_OBSTRUCTION.to_string(),
            max_attr: MAX_TRANSVERSAL_OBSTRUCTION.to_string(),
            propagated_attr: MAX_TRANSVERSAL_OBSTRUCTION_PROPAGATED.to_string(),
            cumulated_attr: MAX_TRANSVERSAL_OBSTRUCTION_CUMULATED.to_string(),
            root_obstruction: 0.0,
        }
    }
}

impl DerivedAttributes {
    /// The three attributes a score can be computed on.
    pub fn score_attributes(&self) -> [&str; 3] {
        [
            self.max_attr.as_str(),
            self.propagated_attr.as_str(),
            self.cumulated_attr.as_str(),
        ]
    }
}

/// Write max, propagated and cumulated attributes on every edge, root to leaf.
///
/// The raw value comes from `input_attr`; when an edge has none, an already present
/// `max_attr` is taken as the raw value. Edges with neither keep their derived attributes
/// unset and pass the parent's path values on to their children.
#[instrument(level = "debug", skip(tree))]
pub fn derive_obstruction_attributes(
    tree: &mut ArterialTree,
    names: &DerivedAttributes,
) -> DomainResult<()> {
    tree.validate()?;
    if !(0.0..=1.0).contains(&names.root_obstruction) {
        return Err(DomainError::InvalidConfiguration(format!(
            "root obstruction must lie in [0, 1], got {}",
            names.root_obstruction
        )));
    }

    let order: Vec<Index> = tree.iter().map(|(idx, _)| idx).collect();
    // (propagated, cumulated) per visited node
    let mut path_values: HashMap<Index, (f64, f64)> = HashMap::with_capacity(order.len());
    let mut skipped = 0usize;

    for idx in order {
        let parent = tree.get_node(idx).and_then(|node| node.parent);
        let Some(parent) = parent else {
            path_values.insert(idx, (names.root_obstruction, names.root_obstruction));
            continue;
        };
        let (parent_prop, parent_cum) = path_values
            .get(&parent)
            .copied()
            .ok_or_else(|| DomainError::MalformedTree("parent visited after child".to_string()))?;

        let own = match tree.obstruction(idx, &names.input_attr) {
            Ok(value) => Some(value),
            Err(DomainError::AttributeMissing { .. }) => {
                match tree.obstruction(idx, &names.max_attr) {
                    Ok(value) => Some(value),
                    Err(DomainError::AttributeMissing { .. }) => None,
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        let Some(own) = own else {
            skipped += 1;
            path_values.insert(idx, (parent_prop, parent_cum));
            continue;
        };
        let prop = propagate(parent_prop, own);
        let cum = cumulate(parent_cum, own);

        if let Some(segment) = tree.segment_mut(idx) {
            segment.set_attribute(&names.max_attr, own);
            segment.set_attribute(&names.propagated_attr, prop);
            segment.set_attribute(&names.cumulated_attr, cum);
        }
        path_values.insert(idx, (prop, cum));
    }

    debug!(
        "derived obstruction attributes on {} edges, {} without '{}'",
        tree.edge_count() - skipped,
        skipped,
        names.input_attr
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{NodeData, Segment};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_combination_rules() {
        assert_eq!(propagate(0.3, 0.2), 0.3);
        assert_eq!(propagate(0.3, 0.7), 0.7);
        assert_close(cumulate(0.5, 0.5), 0.75);
        assert_close(cumulate(0.0, 0.4), 0.4);
    }

    #[test]
    fn test_scalar_wins_over_series() {
        let mut tree = ArterialTree::new();
        let root = tree.insert_node(NodeData::unleveled("r"), None, Segment::default());
        let e = tree.insert_node(
            NodeData::new("a", 2),
            Some(root),
            Segment::default()
                .with_attribute("o", 0.2)
                .with_series("o", vec![0.9])
                .with_series("s", vec![0.1, 0.6, 0.3]),
        );
        assert_eq!(tree.obstruction(e, "o").unwrap(), 0.2);
        assert_eq!(tree.obstruction(e, "s").unwrap(), 0.6);
    }

    #[test]
    fn test_missing_empty_and_out_of_range_values() {
        let mut tree = ArterialTree::new();
        let root = tree.insert_node(NodeData::unleveled("r"), None, Segment::default());
        let e = tree.insert_node(
            NodeData::new("a", 2),
            Some(root),
            Segment::default()
                .with_attribute("high", 1.5)
                .with_attribute("nan", f64::NAN)
                .with_series("empty", vec![]),
        );
        assert!(matches!(
            tree.obstruction(e, "nope"),
            Err(DomainError::AttributeMissing { .. })
        ));
        assert!(matches!(
            tree.obstruction(e, "empty"),
            Err(DomainError::AttributeMissing { .. })
        ));
        assert!(matches!(
            tree.obstruction(e, "high"),
            Err(DomainError::ObstructionOutOfRange { value, .. }) if value == 1.5
        ));
        assert!(matches!(
            tree.obstruction(e, "nan"),
            Err(DomainError::ObstructionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_derive_writes_path_values() {
        let mut tree = ArterialTree::new();
        let root = tree.insert_node(NodeData::unleveled("r"), None, Segment::default());
        let a = tree.insert_node(
            NodeData::new("a", 2),
            Some(root),
            Segment::default().with_series(TRANSVERSAL_OBSTRUCTION, vec![0.1, 0.5]),
        );
        let b = tree.insert_node(
            NodeData::new("b", 3),
            Some(a),
            Segment::default().with_series(TRANSVERSAL_OBSTRUCTION, vec![0.2]),
        );
        // no input series: falls back to an existing max value
        let c = tree.insert_node(
            NodeData::new("c", 4),
            Some(b),
            Segment::default().with_attribute(MAX_TRANSVERSAL_OBSTRUCTION, 0.6),
        );

        let names = DerivedAttributes::default();
        derive_obstruction_attributes(&mut tree, &names).unwrap();

        assert_close(tree.obstruction(a, &names.max_attr).unwrap(), 0.5);
        assert_close(tree.obstruction(b, &names.max_attr).unwrap(), 0.2);
        assert_close(tree.obstruction(b, &names.propagated_attr).unwrap(), 0.5);
        assert_close(tree.obstruction(b, &names.cumulated_attr).unwrap(), 0.6);
        assert_close(tree.obstruction(c, &names.propagated_attr).unwrap(), 0.6);
        assert_close(tree.obstruction(c, &names.cumulated_attr).unwrap(), 0.84);
    }

    #[test]
    fn test_derive_skips_edges_without_raw_value() {
        let mut tree = ArterialTree::new();
        let root = tree.insert_node(NodeData::unleveled("r"), None, Segment::default());
        let a = tree.insert_node(
            NodeData::new("a", 2),
            Some(root),
            Segment::default().with_series(TRANSVERSAL_OBSTRUCTION, vec![0.5]),
        );
        let b = tree.insert_node(
            NodeData::new("b", 3),
            Some(a),
            Segment::default().with_attribute("occupancy", 0.4),
        );
        let c = tree.insert_node(
            NodeData::new("c", 4),
            Some(b),
            Segment::default().with_series(TRANSVERSAL_OBSTRUCTION, vec![0.2]),
        );

        let names = DerivedAttributes::default();
        derive_obstruction_attributes(&mut tree, &names).unwrap();

        assert!(matches!(
            tree.obstruction(b, &names.max_attr),
            Err(DomainError::AttributeMissing { .. })
        ));
        assert_close(tree.obstruction(b, "occupancy").unwrap(), 0.4);
        // c sees a's path values through the skipped edge
        assert_close(tree.obstruction(c, &names.propagated_attr).unwrap(), 0.5);
        assert_close(tree.obstruction(c, &names.cumulated_attr).unwrap(), 0.6);
    }
}
