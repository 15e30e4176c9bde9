//! Qanadli score: weighted obstruction degrees over a pruned selection of segments.
//!
//! The traversal stops at the first proximal (mediastinal or lobar) artery that is
//! obstructed above the lower threshold; that artery stands for all segmental
//! arteries below it. Segmental arteries reached by the traversal count individually.
//! Every segmental artery is therefore weighted exactly once.

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::domain::aggregate::SegmentalCounts;
use crate::domain::arena::ArterialTree;
use crate::domain::classifier::{classify, ArteryLevel};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::obstruction::MAX_TRANSVERSAL_OBSTRUCTION;
use crate::domain::scoring::report::{EdgeContribution, ScoreMethod, ScoreReport};

/// Highest Qanadli degree.
pub const MAX_DEGREE: u8 = 2;

/// How a proximal artery's obstruction is compared to the lower threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximalBoundary {
    /// Selected when `o > T_min`
    #[default]
    Exclusive,
    /// Selected when `o >= T_min`
    Inclusive,
}

impl ProximalBoundary {
    fn selects(self, obstruction: f64, min_thresh: f64) -> bool {
        match self {
            ProximalBoundary::Exclusive => obstruction > min_thresh,
            ProximalBoundary::Inclusive => obstruction >= min_thresh,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QanadliConfig {
    pub obstruction_attr: String,
    pub min_obstruction_thresh: f64,
    pub max_obstruction_thresh: f64,
    pub boundary: ProximalBoundary,
}

impl Default for QanadliConfig {
    fn default() -> Self {
        Self {
            obstruction_attr: MAX_TRANSVERSAL_OBSTRUCTION.to_string(),
            min_obstruction_thresh: 0.25,
            max_obstruction_thresh: 0.75,
            boundary: ProximalBoundary::Exclusive,
        }
    }
}

impl QanadliConfig {
    /// Thresholds must satisfy `0 <= T_min < T_max <= 1`.
    pub fn validate(&self) -> DomainResult<()> {
        let (min, max) = (self.min_obstruction_thresh, self.max_obstruction_thresh);
        if !min.is_finite() || !max.is_finite() {
            return Err(DomainError::InvalidConfiguration(format!(
                "thresholds must be finite (min {min}, max {max})"
            )));
        }
        if !(0.0 <= min && min < max && max <= 1.0) {
            return Err(DomainError::InvalidConfiguration(format!(
                "thresholds must satisfy 0 <= min < max <= 1 (min {min}, max {max})"
            )));
        }
        Ok(())
    }

    /// Degree 0 below `T_min`, 1 up to `T_max`, 2 from `T_max` on.
    pub fn degree(&self, obstruction: f64) -> u8 {
        if obstruction < self.min_obstruction_thresh {
            0
        } else if obstruction < self.max_obstruction_thresh {
            1
        } else {
            MAX_DEGREE
        }
    }
}

#[instrument(level = "debug", skip(tree))]
pub fn compute_qanadli(tree: &ArterialTree, config: &QanadliConfig) -> DomainResult<ScoreReport> {
    config.validate()?;
    tree.validate()?;
    let counts = SegmentalCounts::compute(tree)?;

    let mut selection = Selection {
        tree,
        config,
        counts: &counts,
        breakdown: Vec::new(),
    };
    if let Some(root) = tree.root() {
        selection.visit_children(root)?;
    }
    let breakdown = selection.breakdown;

    let total_weight: usize = breakdown.iter().map(|c| c.weight).sum();
    if total_weight == 0 {
        return Err(DomainError::EmptySelection(
            "no segmental arteries to weight".to_string(),
        ));
    }
    debug_assert_eq!(total_weight, counts.total());

    let weighted: usize = breakdown
        .iter()
        .map(|c| c.weight * usize::from(c.degree))
        .sum();
    let score = weighted as f64 / (f64::from(MAX_DEGREE) * total_weight as f64);
    debug!(
        "qanadli: {} selected, weight {}, score {}",
        breakdown.len(),
        total_weight,
        score
    );

    Ok(ScoreReport {
        method: ScoreMethod::Qanadli,
        obstruction_attr: config.obstruction_attr.clone(),
        score,
        total_weight,
        breakdown,
    })
}

/// Depth-first selection state for one scoring call.
struct Selection<'a> {
    tree: &'a ArterialTree,
    config: &'a QanadliConfig,
    counts: &'a SegmentalCounts,
    breakdown: Vec<EdgeContribution>,
}

impl Selection<'_> {
    fn visit_children(&mut self, node: Index) -> DomainResult<()> {
        let tree = self.tree;
        let Some(vessel) = tree.get_node(node) else {
            return Ok(());
        };
        for &child in &vessel.children {
            self.visit_edge(child)?;
        }
        Ok(())
    }

    fn visit_edge(&mut self, edge: Index) -> DomainResult<()> {
        let level = classify(self.tree, edge)?;
        let value = self.tree.obstruction(edge, &self.config.obstruction_attr)?;

        match level {
            ArteryLevel::Segmental => self.select(edge, level, value, 1),
            ArteryLevel::Mediastinal | ArteryLevel::Lobar => {
                if self
                    .config
                    .boundary
                    .selects(value, self.config.min_obstruction_thresh)
                {
                    self.select(edge, level, value, self.counts.get(edge));
                } else {
                    trace!("descending below {}", self.tree.edge_label(edge));
                    self.visit_children(edge)?;
                }
            }
        }
        Ok(())
    }

    fn select(&mut self, edge: Index, level: ArteryLevel, value: f64, weight: usize) {
        self.breakdown.push(EdgeContribution {
            edge_id: edge,
            edge: self.tree.edge_label(edge),
            level,
            value,
            degree: self.config.degree(value),
            weight,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_boundaries() {
        let config = QanadliConfig::default();
        assert_eq!(config.degree(0.0), 0);
        assert_eq!(config.degree(0.2499), 0);
        assert_eq!(config.degree(0.25), 1);
        assert_eq!(config.degree(0.7499), 1);
        assert_eq!(config.degree(0.75), 2);
        assert_eq!(config.degree(1.0), 2);
    }

    #[test]
    fn test_threshold_validation() {
        let bad = [(0.5, 0.5), (0.8, 0.2), (-0.1, 0.5), (0.1, 1.1), (f64::NAN, 0.5)];
        for (min, max) in bad {
            let config = QanadliConfig {
                min_obstruction_thresh: min,
                max_obstruction_thresh: max,
                ..QanadliConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(DomainError::InvalidConfiguration(_))),
                "({min}, {max}) should be rejected"
            );
        }
        assert!(QanadliConfig::default().validate().is_ok());
    }

    #[test]
    fn test_boundary_modes() {
        assert!(!ProximalBoundary::Exclusive.selects(0.25, 0.25));
        assert!(ProximalBoundary::Inclusive.selects(0.25, 0.25));
        assert!(ProximalBoundary::Exclusive.selects(0.26, 0.25));
    }
}
