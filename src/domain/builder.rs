//! Tree builder: turns flat node and link lists into a validated arterial tree.

use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::arena::ArterialTree;
use crate::domain::entities::{NodeData, Segment};
use crate::domain::error::{DomainError, DomainResult};

/// A node as listed in the source graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub id: String,
    pub level: Option<i64>,
}

/// A directed link as listed in the source graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub source: String,
    pub target: String,
    /// Level of the target node, when the source data stores levels on links
    pub level: Option<i64>,
    pub segment: Segment,
}

/// Constructs an arterial tree from node and link lists.
///
/// Every structural problem (duplicate ids, unknown endpoints, several parents,
/// several or no roots, cycles, unreachable nodes) is reported before the tree is used.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    /// parent id -> indices of its outgoing links
    relationship_cache: HashMap<String, Vec<usize>>,
    /// child id -> index of its incoming link
    parent_links: HashMap<String, usize>,
    visited: HashSet<String>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "debug", skip_all, fields(nodes = nodes.len(), links = links.len()))]
    pub fn build(
        &mut self,
        nodes: Vec<NodeSpec>,
        mut links: Vec<LinkSpec>,
    ) -> DomainResult<ArterialTree> {
        // Reset state for a fresh build
        self.relationship_cache.clear();
        self.parent_links.clear();
        self.visited.clear();

        let mut by_id: HashMap<String, NodeSpec> = HashMap::with_capacity(nodes.len());
        let mut order = Vec::with_capacity(nodes.len());
        for node in nodes {
            if by_id.contains_key(&node.id) {
                return Err(DomainError::MalformedTree(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            order.push(node.id.clone());
            by_id.insert(node.id.clone(), node);
        }

        self.index_links(&by_id, &links)?;

        let root = self.find_root(&order)?;
        let Some(root) = root else {
            return Ok(ArterialTree::new());
        };

        let tree = self.build_tree(&root, &by_id, &mut links)?;

        if self.visited.len() != by_id.len() {
            let unreachable = order
                .iter()
                .filter(|id| !self.visited.contains(*id))
                .join(", ");
            return Err(DomainError::MalformedTree(format!(
                "nodes not reachable from root '{root}' (cycle?): {unreachable}"
            )));
        }

        debug!(
            "built tree: {} nodes, {} edges",
            tree.node_count(),
            tree.edge_count()
        );
        Ok(tree)
    }

    fn index_links(
        &mut self,
        by_id: &HashMap<String, NodeSpec>,
        links: &[LinkSpec],
    ) -> DomainResult<()> {
        for (i, link) in links.iter().enumerate() {
            for endpoint in [&link.source, &link.target] {
                if !by_id.contains_key(endpoint) {
                    return Err(DomainError::MalformedTree(format!(
                        "link {}->{} references unknown node '{}'",
                        link.source, link.target, endpoint
                    )));
                }
            }
            if link.source == link.target {
                return Err(DomainError::MalformedTree(format!(
                    "self-link on node '{}'",
                    link.source
                )));
            }
            if self.parent_links.insert(link.target.clone(), i).is_some() {
                return Err(DomainError::MalformedTree(format!(
                    "node '{}' has several parents",
                    link.target
                )));
            }
            self.relationship_cache
                .entry(link.source.clone())
                .or_default()
                .push(i);
        }
        Ok(())
    }

    /// The single node without a parent; None for an empty graph.
    fn find_root(&self, order: &[String]) -> DomainResult<Option<String>> {
        let roots: Vec<&String> = order
            .iter()
            .filter(|id| !self.parent_links.contains_key(*id))
            .collect();
        match roots.as_slice() {
            [] if order.is_empty() => Ok(None),
            [] => Err(DomainError::MalformedTree(
                "no root node: every node has a parent (cycle)".to_string(),
            )),
            [root] => Ok(Some((*root).clone())),
            several => Err(DomainError::MalformedTree(format!(
                "multiple roots found: {}",
                several.iter().join(", ")
            ))),
        }
    }

    /// Breadth-first insertion from the root, so every parent exists before its children.
    fn build_tree(
        &mut self,
        root: &str,
        by_id: &HashMap<String, NodeSpec>,
        links: &mut [LinkSpec],
    ) -> DomainResult<ArterialTree> {
        let mut tree = ArterialTree::new();
        let mut queue = VecDeque::from([(root.to_string(), None, None)]);

        while let Some((current, parent_idx, link_idx)) = queue.pop_front() {
            // Cycle detection
            if !self.visited.insert(current.clone()) {
                return Err(DomainError::MalformedTree(format!(
                    "cycle detected at node '{current}'"
                )));
            }

            let spec = by_id
                .get(&current)
                .ok_or_else(|| DomainError::MalformedTree(format!("unknown node '{current}'")))?;
            let (link_level, segment) = match link_idx {
                Some(i) => {
                    let link: &mut LinkSpec = &mut links[i];
                    (link.level, std::mem::take(&mut link.segment))
                }
                None => (None, Segment::default()),
            };
            let data = NodeData {
                id: current.clone(),
                level: spec.level.or(link_level),
            };
            let current_idx = tree.insert_node(data, parent_idx, segment);

            if let Some(children) = self.relationship_cache.get(&current) {
                for &i in children {
                    queue.push_back((links[i].target.clone(), Some(current_idx), Some(i)));
                }
            }
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, level: Option<i64>) -> NodeSpec {
        NodeSpec {
            id: id.to_string(),
            level,
        }
    }

    fn link(source: &str, target: &str) -> LinkSpec {
        LinkSpec {
            source: source.to_string(),
            target: target.to_string(),
            level: None,
            segment: Segment::default(),
        }
    }

    #[test]
    fn given_link_level_when_node_has_none_then_node_inherits_it() {
        let mut ab = link("a", "b");
        ab.level = Some(3);
        let tree = TreeBuilder::new()
            .build(vec![node("a", None), node("b", None)], vec![ab])
            .unwrap();
        let b = tree.find("b").unwrap();
        assert_eq!(tree.get_node(b).unwrap().data.level, Some(3));
    }

    #[test]
    fn given_no_nodes_when_building_then_tree_is_empty() {
        let tree = TreeBuilder::new().build(vec![], vec![]).unwrap();
        assert_eq!(tree.node_count(), 0);
        assert!(tree.root().is_none());
    }

    #[test]
    fn given_self_link_when_building_then_fails() {
        let err = TreeBuilder::new()
            .build(vec![node("a", None)], vec![link("a", "a")])
            .unwrap_err();
        assert!(matches!(err, DomainError::MalformedTree(msg) if msg.contains("self-link")));
    }
}
