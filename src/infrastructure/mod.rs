//! Infrastructure layer: file system access and service wiring
//!
//! `RealFileSystem` backs the `FileSystem` trait the services read graphs through.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult};
