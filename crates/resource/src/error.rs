//! Error types for resource access.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a fixture resource.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource could not be opened or read.
    #[error("Failed to read file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource path has no file name component.
    #[error("Filename should not be null: {}", path.display())]
    MissingName { path: PathBuf },
}

impl ResourceError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResourceError::Read {
            path: path.into(),
            source,
        }
    }
}
