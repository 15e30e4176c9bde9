//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

/// Node payload: identifier and anatomical level code.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Identifier as found in the source graph
    pub id: String,
    /// Raw anatomical level code (1-2 mediastinal, 3 lobar, 4 segmental)
    pub level: Option<i64>,
}

impl NodeData {
    pub fn new(id: impl Into<String>, level: i64) -> Self {
        Self {
            id: id.into(),
            level: Some(level),
        }
    }

    /// Node without a level, e.g. the root of a tree whose levels live on links.
    pub fn unleveled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level: None,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Obstruction attributes carried by the segment entering a node.
///
/// Scalar attributes hold one value per name. Series hold the raw per-slice
/// measurements of the source data, e.g. `transversal_obstruction`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    pub attributes: BTreeMap<String, f64>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl Segment {
    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_series(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.series.insert(name.into(), values);
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: f64) {
        self.attributes.insert(name.to_string(), value);
    }
}
