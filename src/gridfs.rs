//! File fixtures: resources streamed into GridFS.

use crate::cleanup::TouchedDatabases;
use crate::context::TestContext;
use crate::document::parse_metadata;
use crate::error::FixtureError;
use crate::fixture::FileFixture;
use crate::store::FileUpload;
use bson::oid::ObjectId;
use bson::Bson;
use tracing::info;

/// Chunk size for every uploaded fixture file.
pub const CHUNK_SIZE_BYTES: u32 = 1024;

/// Loads [`FileFixture`]s and remembers which databases it wrote to.
#[derive(Debug, Default)]
pub struct FileFixtureLoader {
    touched: TouchedDatabases,
}

impl FileFixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the fixture's file into the default bucket.
    ///
    /// The id, file name and metadata are all checked before the resource
    /// is opened, so an invalid declaration never starts an upload.
    /// Returns the number of bytes stored.
    pub async fn load(
        &mut self,
        fixture: &FileFixture,
        context: &TestContext<'_>,
    ) -> Result<u64, FixtureError> {
        let id = parse_file_id(&fixture.id)?;
        let resource = context.resource(&fixture.file_path);
        let filename = resource.filename()?.to_string();
        let metadata = parse_metadata(&fixture.metadata)?;

        let database = context.resolve_database(fixture.database.as_deref())?;
        self.touched.insert(&database);

        let stream = resource.open().await?;
        let upload = FileUpload {
            id,
            filename: filename.clone(),
            chunk_size_bytes: CHUNK_SIZE_BYTES,
            metadata,
        };
        let length = context
            .store
            .upload_file(&database, upload, Box::new(stream))
            .await?;

        info!(
            "Uploaded {} ({} bytes) to GridFS in {} with id {}",
            filename, length, database, fixture.id
        );
        Ok(length)
    }

    pub fn touched(&self) -> &TouchedDatabases {
        &self.touched
    }

    pub(crate) fn touched_mut(&mut self) -> &mut TouchedDatabases {
        &mut self.touched
    }
}

/// Parse a declared file id as an ObjectId.
pub fn parse_file_id(id: &str) -> Result<Bson, FixtureError> {
    ObjectId::parse_str(id)
        .map(Bson::ObjectId)
        .map_err(|source| FixtureError::InvalidFileId {
            id: id.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_id() {
        let id = parse_file_id("60327c7f9189342c201e0e12").unwrap();
        assert_eq!(
            id,
            Bson::ObjectId(ObjectId::parse_str("60327c7f9189342c201e0e12").unwrap())
        );
    }

    #[test]
    fn test_parse_file_id_invalid() {
        let err = parse_file_id("not-an-object-id").unwrap_err();
        assert!(matches!(err, FixtureError::InvalidFileId { .. }));
        assert!(err.to_string().contains("not-an-object-id"));
    }
}
