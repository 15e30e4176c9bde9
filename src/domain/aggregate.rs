//! Segmental descendant counts, computed once per tree.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::arena::{ArterialTree, EdgeId};
use crate::domain::classifier::{classify, ArteryLevel};
use crate::domain::error::DomainResult;

/// Number of segmental edges below every edge of one tree.
///
/// A segmental edge counts 1 for itself and is terminal: segmental edges nested
/// below it are folded into it. Any other edge counts the sum of its children.
#[derive(Debug, Clone, Default)]
pub struct SegmentalCounts {
    counts: HashMap<EdgeId, usize>,
    total: usize,
}

impl SegmentalCounts {
    /// Single post-order pass: every child is counted before its parent.
    #[instrument(level = "debug", skip(tree))]
    pub fn compute(tree: &ArterialTree) -> DomainResult<Self> {
        let mut counts: HashMap<EdgeId, usize> = HashMap::with_capacity(tree.node_count());
        let mut total = 0;

        for (idx, node) in tree.iter_postorder() {
            let below: usize = node
                .children
                .iter()
                .map(|child| counts.get(child).copied().unwrap_or(0))
                .sum();
            if node.parent.is_none() {
                total = below;
                continue;
            }
            let count = match classify(tree, idx)? {
                ArteryLevel::Segmental => 1,
                ArteryLevel::Mediastinal | ArteryLevel::Lobar => below,
            };
            counts.insert(idx, count);
        }

        debug!("segmental edges in tree: {}", total);
        Ok(Self { counts, total })
    }

    /// Segmental edges in the subtree entered by `edge` (0 for unknown edges).
    pub fn get(&self, edge: EdgeId) -> usize {
        self.counts.get(&edge).copied().unwrap_or(0)
    }

    /// Segmental edges of the whole tree.
    pub fn total(&self) -> usize {
        self.total
    }
}
