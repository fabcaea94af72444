//! Error types for fixture loading and cleanup.

use crate::config::{DATABASE_KEY, URI_KEY};
use mongo_fixtures_resource::ResourceError;
use thiserror::Error;

/// Errors that abort the setup phase of a test method.
///
/// None of these are retried. Documents inserted before the failure stay
/// in the database until the next cleanup pass.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Neither configuration key yields a database name.
    #[error(
        "Failed to determine database. You need to provide either '{}' or '{}' in the fixture configuration.",
        DATABASE_KEY,
        URI_KEY
    )]
    UnspecifiedDatabase,

    /// The configured connection string could not be parsed.
    #[error("Invalid MongoDB connection string: {0}")]
    InvalidConnectionString(#[source] mongodb::error::Error),

    /// A fixture resource could not be read or has no name.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A document resource is not valid Extended JSON.
    #[error("Invalid fixture document in {resource}: {message}")]
    InvalidDocument { resource: String, message: String },

    /// File metadata is not a valid Extended JSON document.
    #[error("Invalid file metadata '{metadata}': {message}")]
    InvalidMetadata { metadata: String, message: String },

    /// A file id is not a valid ObjectId.
    #[error("Invalid file id '{id}': {source}")]
    InvalidFileId {
        id: String,
        #[source]
        source: bson::oid::Error,
    },

    /// Streaming a file into GridFS failed.
    #[error("Failed to upload '{filename}' to GridFS: {source}")]
    Upload {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// MongoDB connection or query error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),
}

impl FixtureError {
    /// True for the errors callers can fix by changing configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FixtureError::UnspecifiedDatabase | FixtureError::InvalidConnectionString(_)
        )
    }
}
