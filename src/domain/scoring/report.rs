use std::fmt;

use serde::Serialize;

use crate::domain::arena::EdgeId;
use crate::domain::classifier::ArteryLevel;

/// Scoring method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    Mastora,
    Qanadli,
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMethod::Mastora => write!(f, "Mastora"),
            ScoreMethod::Qanadli => write!(f, "Qanadli"),
        }
    }
}

/// One selected segment and what it contributed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeContribution {
    #[serde(skip)]
    pub edge_id: EdgeId,
    /// `parent->child`
    pub edge: String,
    pub level: ArteryLevel,
    /// Obstruction value read from the selected attribute
    pub value: f64,
    pub degree: u8,
    pub weight: usize,
}

impl EdgeContribution {
    /// Compact label, e.g. `M: 0.80 (w:2, d:2)`.
    pub fn label(&self) -> String {
        format!(
            "{}: {:.2} (w:{}, d:{})",
            self.level.key().to_ascii_uppercase(),
            self.value,
            self.weight,
            self.degree
        )
    }
}

/// Result of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub method: ScoreMethod,
    pub obstruction_attr: String,
    /// Normalized severity in [0, 1]
    pub score: f64,
    /// Normalization weight: N for Mastora, W for Qanadli
    pub total_weight: usize,
    pub breakdown: Vec<EdgeContribution>,
}
