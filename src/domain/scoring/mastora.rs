//! Mastora score: mean obstruction over a level-filtered set of segments.

use tracing::{debug, instrument};

use crate::domain::arena::ArterialTree;
use crate::domain::classifier::{classify, LevelSet};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::obstruction::MAX_TRANSVERSAL_OBSTRUCTION;
use crate::domain::scoring::report::{EdgeContribution, ScoreMethod, ScoreReport};

/// Highest Mastora degree.
pub const MAX_DEGREE: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MastoraConfig {
    pub obstruction_attr: String,
    /// Artery levels included in the score
    pub mode: LevelSet,
    /// Average raw obstruction instead of degrees 1..5
    pub use_percentage: bool,
}

impl Default for MastoraConfig {
    fn default() -> Self {
        Self {
            obstruction_attr: MAX_TRANSVERSAL_OBSTRUCTION.to_string(),
            mode: LevelSet::all(),
            use_percentage: false,
        }
    }
}

/// Degree 1..5 in steps of 25 % obstruction; a full obstruction is degree 5.
pub fn mastora_degree(obstruction: f64) -> u8 {
    let bucket = (obstruction / 0.25).floor() as u8;
    bucket.min(MAX_DEGREE - 1) + 1
}

#[instrument(level = "debug", skip(tree))]
pub fn compute_mastora(tree: &ArterialTree, config: &MastoraConfig) -> DomainResult<ScoreReport> {
    tree.validate()?;

    let mut breakdown = Vec::new();
    for (edge, _) in tree.edges() {
        let level = classify(tree, edge)?;
        if !config.mode.contains(level) {
            continue;
        }
        let value = tree.obstruction(edge, &config.obstruction_attr)?;
        breakdown.push(EdgeContribution {
            edge_id: edge,
            edge: tree.edge_label(edge),
            level,
            value,
            degree: mastora_degree(value),
            weight: 1,
        });
    }

    let n = breakdown.len();
    if n == 0 {
        return Err(DomainError::EmptySelection(format!(
            "no segments at levels '{}'",
            config.mode
        )));
    }

    let score = if config.use_percentage {
        breakdown.iter().map(|c| c.value).sum::<f64>() / n as f64
    } else {
        let degrees: u64 = breakdown.iter().map(|c| u64::from(c.degree)).sum();
        degrees as f64 / (f64::from(MAX_DEGREE) * n as f64)
    };
    debug!("mastora: {} segments, score {}", n, score);

    Ok(ScoreReport {
        method: ScoreMethod::Mastora,
        obstruction_attr: config.obstruction_attr.clone(),
        score,
        total_weight: n,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mastora_degree_buckets() {
        assert_eq!(mastora_degree(0.0), 1);
        assert_eq!(mastora_degree(0.24), 1);
        assert_eq!(mastora_degree(0.25), 2);
        assert_eq!(mastora_degree(0.6), 3);
        assert_eq!(mastora_degree(0.75), 4);
        assert_eq!(mastora_degree(0.99), 4);
        assert_eq!(mastora_degree(1.0), 5);
    }
}
