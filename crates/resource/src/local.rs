//! Local filesystem reads for fixture resources

use crate::ResourceError;
use std::path::Path;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// Streaming reader over a resource file, usable with `futures::io`
pub type ResourceStream = Compat<tokio::fs::File>;

/// Read the entire file as UTF-8 text
pub(crate) async fn read_to_string(path: &Path) -> Result<String, ResourceError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ResourceError::read(path, e))?;
    tracing::debug!("Read {} bytes from {}", contents.len(), path.display());
    Ok(contents)
}

/// Open the file for streaming reads
pub(crate) async fn open(path: &Path) -> Result<ResourceStream, ResourceError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ResourceError::read(path, e))?;
    Ok(file.compat())
}
