//! Artery classification by anatomical level.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use generational_arena::Index;
use serde::Serialize;

use crate::domain::arena::ArterialTree;
use crate::domain::error::{DomainError, DomainResult};

/// Anatomical level of an artery segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArteryLevel {
    Mediastinal,
    Lobar,
    Segmental,
}

/// Level code -> artery level.
const LEVEL_TABLE: [(i64, ArteryLevel); 4] = [
    (1, ArteryLevel::Mediastinal),
    (2, ArteryLevel::Mediastinal),
    (3, ArteryLevel::Lobar),
    (4, ArteryLevel::Segmental),
];

impl ArteryLevel {
    pub fn from_code(code: i64) -> Option<Self> {
        LEVEL_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, level)| *level)
    }

    /// Single-letter key used in level modes (`m`, `l`, `s`).
    pub fn key(self) -> char {
        match self {
            ArteryLevel::Mediastinal => 'm',
            ArteryLevel::Lobar => 'l',
            ArteryLevel::Segmental => 's',
        }
    }

    fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'm' => Some(ArteryLevel::Mediastinal),
            'l' => Some(ArteryLevel::Lobar),
            's' => Some(ArteryLevel::Segmental),
            _ => None,
        }
    }
}

impl fmt::Display for ArteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArteryLevel::Mediastinal => "mediastinal",
            ArteryLevel::Lobar => "lobar",
            ArteryLevel::Segmental => "segmental",
        };
        write!(f, "{name}")
    }
}

/// Classify the segment entering `node` from the node's stored level.
pub fn classify(tree: &ArterialTree, node: Index) -> DomainResult<ArteryLevel> {
    let vessel = tree
        .get_node(node)
        .ok_or_else(|| DomainError::MalformedTree(format!("unknown node index {node:?}")))?;
    let code = vessel.data.level.ok_or_else(|| DomainError::AttributeMissing {
        location: format!("node '{}'", vessel.data.id),
        attribute: "level".to_string(),
    })?;
    ArteryLevel::from_code(code).ok_or_else(|| {
        DomainError::InvalidConfiguration(format!(
            "node '{}' has unknown level code {code} (expected 1-4)",
            vessel.data.id
        ))
    })
}

/// Non-empty subset of artery levels, parsed from keys like `"mls"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSet(BTreeSet<ArteryLevel>);

impl LevelSet {
    pub fn all() -> Self {
        Self(
            [
                ArteryLevel::Mediastinal,
                ArteryLevel::Lobar,
                ArteryLevel::Segmental,
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn only(level: ArteryLevel) -> Self {
        Self(BTreeSet::from([level]))
    }

    pub fn contains(&self, level: ArteryLevel) -> bool {
        self.0.contains(&level)
    }

    pub fn iter(&self) -> impl Iterator<Item = ArteryLevel> + '_ {
        self.0.iter().copied()
    }
}

impl FromStr for LevelSet {
    type Err = DomainError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let mut levels = BTreeSet::new();
        for key in mode.trim().chars() {
            let level = ArteryLevel::from_key(key).ok_or_else(|| {
                DomainError::InvalidConfiguration(format!(
                    "unknown artery level '{key}' in mode '{mode}' (use m, l, s)"
                ))
            })?;
            levels.insert(level);
        }
        if levels.is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "artery level mode must not be empty".to_string(),
            ));
        }
        Ok(Self(levels))
    }
}

impl fmt::Display for LevelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: String = self.iter().map(ArteryLevel::key).collect();
        write!(f, "{keys}")
    }
}
