//! Severity scores computed on an arterial tree.

pub mod mastora;
pub mod qanadli;
pub mod report;

pub use mastora::{compute_mastora, mastora_degree, MastoraConfig};
pub use qanadli::{compute_qanadli, ProximalBoundary, QanadliConfig};
pub use report::{EdgeContribution, ScoreMethod, ScoreReport};
