//! Application services
//!
//! Services orchestrate domain operations over files resolved through the
//! infrastructure layer.

pub mod batch;
pub mod graph;
pub mod scoring;

pub use batch::{BatchRow, BatchService};
pub use graph::GraphService;
pub use scoring::{ScoreRequest, ScoringService};
