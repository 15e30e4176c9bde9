//! Attach the graph or directory path to I/O failures inside the services

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Wrap an I/O error as `OperationFailed`, keeping the error as source.
    ///
    /// ```ignore
    /// let content = fs.read_to_string(path).with_path_context("read graph", path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action} {}", path.display()),
            source: Box::new(e),
        })
    }
}
