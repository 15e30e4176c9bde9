//! Text rendering of arterial trees with termtree.

use std::collections::HashMap;

use colored::Colorize;
use generational_arena::Index;
use termtree::Tree;

use crate::domain::{classify, ArterialTree, EdgeId, ScoreReport};

/// Renders a tree, one line per node, labelled with the incoming segment's
/// level and obstruction value. Edges selected by a scorer are marked.
pub struct TreeView<'a> {
    obstruction_attr: &'a str,
    highlights: HashMap<EdgeId, String>,
}

impl<'a> TreeView<'a> {
    pub fn new(obstruction_attr: &'a str) -> Self {
        Self {
            obstruction_attr,
            highlights: HashMap::new(),
        }
    }

    /// Mark every edge in the report's breakdown.
    pub fn with_report(mut self, report: &ScoreReport) -> Self {
        self.highlights = report
            .breakdown
            .iter()
            .map(|c| (c.edge_id, c.label()))
            .collect();
        self
    }

    /// None for an empty tree.
    pub fn render(&self, tree: &ArterialTree) -> Option<Tree<String>> {
        let root = tree.root()?;
        let node = tree.get_node(root)?;
        let mut out = Tree::new(node.data.id.clone());
        self.build(tree, root, &mut out);
        Some(out)
    }

    fn build(&self, tree: &ArterialTree, idx: Index, parent: &mut Tree<String>) {
        let Some(node) = tree.get_node(idx) else {
            return;
        };
        for &child in &node.children {
            let mut child_tree = Tree::new(self.label(tree, child));
            self.build(tree, child, &mut child_tree);
            parent.push(child_tree);
        }
    }

    fn label(&self, tree: &ArterialTree, edge: EdgeId) -> String {
        let id = tree
            .get_node(edge)
            .map(|n| n.data.id.clone())
            .unwrap_or_default();
        let level = classify(tree, edge)
            .map(|l| l.key().to_ascii_uppercase().to_string())
            .unwrap_or_else(|_| "?".to_string());
        let value = tree
            .obstruction(edge, self.obstruction_attr)
            .map(|o| format!("{o:.2}"))
            .unwrap_or_else(|_| "-".to_string());

        let label = format!("{id} [{level}] {value}");
        match self.highlights.get(&edge) {
            Some(mark) => format!("{} {}", label.green().bold(), format!("<- {mark}").green()),
            None => label,
        }
    }
}
