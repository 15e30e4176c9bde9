//! Node-link JSON graphs (`{"nodes": [...], "links": [...]}`).
//!
//! Node ids may be numbers or strings. Numeric link attributes become scalar
//! obstruction attributes, numeric arrays become series; anything else is ignored.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::domain::{LinkSpec, NodeSpec, Segment};

const LEVEL_KEY: &str = "level";

#[derive(Debug, Deserialize)]
pub struct NodeLinkGraph {
    #[serde(default)]
    pub directed: Option<bool>,
    pub nodes: Vec<RawNode>,
    #[serde(alias = "edges", default)]
    pub links: Vec<RawLink>,
}

#[derive(Debug, Deserialize)]
pub struct RawNode {
    pub id: Value,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawLink {
    pub source: Value,
    pub target: Value,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl NodeLinkGraph {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Convert into the builder's node and link lists.
    pub fn into_specs(self) -> Result<(Vec<NodeSpec>, Vec<LinkSpec>), String> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| {
                Ok(NodeSpec {
                    id: id_string(&node.id)?,
                    level: level_of(&node.attrs)?,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        let links = self
            .links
            .into_iter()
            .map(|link| {
                Ok(LinkSpec {
                    source: id_string(&link.source)?,
                    target: id_string(&link.target)?,
                    level: level_of(&link.attrs)?,
                    segment: segment_of(&link.attrs),
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok((nodes, links))
    }
}

fn id_string(id: &Value) -> Result<String, String> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("unsupported node id: {other}")),
    }
}

/// Integer level, accepting integral floats such as `2.0`.
fn level_of(attrs: &Map<String, Value>) -> Result<Option<i64>, String> {
    match attrs.get(LEVEL_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(level) = n.as_i64() {
                return Ok(Some(level));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                _ => Err(format!("level must be an integer, got {n}")),
            }
        }
        Some(other) => Err(format!("level must be an integer, got {other}")),
    }
}

fn segment_of(attrs: &Map<String, Value>) -> Segment {
    let mut segment = Segment::default();
    for (name, value) in attrs {
        if name == LEVEL_KEY {
            continue;
        }
        match value {
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    segment.attributes.insert(name.clone(), f);
                }
            }
            Value::Array(items) => {
                let values: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                match values {
                    Some(values) => {
                        segment.series.insert(name.clone(), values);
                    }
                    None => trace!("skipping non-numeric array attribute '{}'", name),
                }
            }
            _ => {}
        }
    }
    segment
}
