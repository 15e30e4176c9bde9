//! Domain layer: arterial tree and scoring engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod arena;
pub mod builder;
pub mod classifier;
pub mod entities;
pub mod error;
pub mod obstruction;
pub mod scoring;

pub use aggregate::SegmentalCounts;
pub use arena::{ArterialTree, EdgeId, VesselNode};
pub use builder::{LinkSpec, NodeSpec, TreeBuilder};
pub use classifier::{classify, ArteryLevel, LevelSet};
pub use entities::{NodeData, Segment};
pub use error::{DomainError, DomainResult};
pub use obstruction::{cumulate, derive_obstruction_attributes, propagate, DerivedAttributes};
pub use scoring::{
    compute_mastora, compute_qanadli, EdgeContribution, MastoraConfig, ProximalBoundary,
    QanadliConfig, ScoreMethod, ScoreReport,
};
