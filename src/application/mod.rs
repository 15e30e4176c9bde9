//! Application layer: services and use cases
//!
//! This layer loads graphs, runs the derived-attribute pre-pass and drives the
//! scoring engine. It depends on I/O boundary traits, never on concrete I/O.

pub mod error;
pub mod error_ext;
pub mod node_link;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
