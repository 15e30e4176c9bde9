use std::collections::HashSet;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{NodeData, Segment};
use crate::domain::error::{DomainError, DomainResult};

/// Identifies a segment by the arena index of its child node.
///
/// Every non-root node has exactly one parent, so the child index is unique per edge.
pub type EdgeId = Index;

/// Tree node in the arena-based arterial tree.
#[derive(Debug)]
pub struct VesselNode {
    /// Identifier and level of this node
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena
    pub children: Vec<Index>,
    /// Attributes of the segment parent -> this node (empty for the root)
    pub segment: Segment,
}

/// Arena-based arterial tree.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Scorers only ever see `&ArterialTree`; independent trees share nothing.
#[derive(Debug)]
pub struct ArterialTree {
    /// Arena storage for all tree nodes
    arena: Arena<VesselNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for ArterialTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ArterialTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node below `parent`, or as the root when `parent` is None.
    ///
    /// `segment` describes the edge parent -> node and is ignored for the root.
    #[instrument(level = "trace", skip(self, segment))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>, segment: Segment) -> Index {
        let node = VesselNode {
            data,
            parent,
            children: Vec::new(),
            segment,
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&VesselNode> {
        self.arena.get(idx)
    }

    /// Mutable access to a segment's attributes. Structure stays read-only.
    pub fn segment_mut(&mut self, edge: EdgeId) -> Option<&mut Segment> {
        self.arena.get_mut(edge).map(|node| &mut node.segment)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arena.iter().filter(|(_, n)| n.parent.is_some()).count()
    }

    /// Find a node by its source identifier.
    pub fn find(&self, id: &str) -> Option<Index> {
        self.arena
            .iter()
            .find(|(_, node)| node.data.id == id)
            .map(|(idx, _)| idx)
    }

    /// Human-readable edge name: `parent->child`.
    pub fn edge_label(&self, edge: EdgeId) -> String {
        let Some(node) = self.get_node(edge) else {
            return format!("{edge:?}");
        };
        match node.parent.and_then(|p| self.get_node(p)) {
            Some(parent) => format!("{}->{}", parent.data.id, node.data.id),
            None => node.data.id.clone(),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Edges in pre-order (root-to-leaf), i.e. every node except the root.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &VesselNode)> + '_ {
        self.iter().filter(|(_, node)| node.parent.is_some())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Re-check the arborescence invariants: single root, every node reachable,
    /// parent and children links consistent, no node visited twice.
    ///
    /// An empty arena is a valid (edgeless) tree.
    #[instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> DomainResult<()> {
        let Some(root) = self.root else {
            if self.arena.is_empty() {
                return Ok(());
            }
            return Err(DomainError::MalformedTree("no root node".to_string()));
        };
        let root_node = self
            .get_node(root)
            .ok_or_else(|| DomainError::MalformedTree("root index is dangling".to_string()))?;
        if root_node.parent.is_some() {
            return Err(DomainError::MalformedTree(format!(
                "root '{}' has a parent",
                root_node.data.id
            )));
        }

        let mut seen = HashSet::with_capacity(self.arena.len());
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = self.get_node(idx).ok_or_else(|| {
                DomainError::MalformedTree(format!("dangling child index {idx:?}"))
            })?;
            if !seen.insert(idx) {
                return Err(DomainError::MalformedTree(format!(
                    "node '{}' is reached twice (cycle or several parents)",
                    node.data.id
                )));
            }
            for &child in &node.children {
                let child_node = self.get_node(child).ok_or_else(|| {
                    DomainError::MalformedTree(format!(
                        "node '{}' has a dangling child",
                        node.data.id
                    ))
                })?;
                if child_node.parent != Some(idx) {
                    return Err(DomainError::MalformedTree(format!(
                        "node '{}' is listed under '{}' but has another parent",
                        child_node.data.id, node.data.id
                    )));
                }
                stack.push(child);
            }
        }

        if seen.len() != self.arena.len() {
            let orphan = self
                .arena
                .iter()
                .find(|(idx, _)| !seen.contains(idx))
                .map(|(_, node)| node.data.id.clone())
                .unwrap_or_default();
            return Err(DomainError::MalformedTree(format!(
                "node '{orphan}' is not reachable from the root"
            )));
        }
        Ok(())
    }
}

pub struct TreeIterator<'a> {
    tree: &'a ArterialTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a ArterialTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a VesselNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a ArterialTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a ArterialTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push((root, false));
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a VesselNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
