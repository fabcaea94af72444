//! Database access used by fixture loading and cleanup.
//!
//! [`FixtureStore`] is the seam between the lifecycle and MongoDB.
//! [`MongoStore`] talks to a real server; `testing::InMemoryStore` stands
//! in for it in tests.

use crate::error::FixtureError;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::io::AsyncRead;
use futures::AsyncWriteExt;
use mongodb::options::{ClientOptions, GridFsBucketOptions};
use mongodb::{Client, Collection, Database};
use std::time::Duration;

/// Name of the GridFS bucket fixtures are uploaded into.
pub const DEFAULT_BUCKET: &str = "fs";

/// Suffix of the collection holding a bucket's file documents.
pub const FILES_SUFFIX: &str = ".files";

/// Suffix of the collection holding a bucket's chunks.
pub const CHUNKS_SUFFIX: &str = ".chunks";

/// Reader handed to [`FixtureStore::upload_file`].
pub type UploadReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// Parameters of a single GridFS upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub id: Bson,
    pub filename: String,
    pub chunk_size_bytes: u32,
    pub metadata: Document,
}

#[async_trait]
pub trait FixtureStore: Send + Sync {
    /// Names of every database on the server.
    async fn list_database_names(&self) -> Result<Vec<String>, FixtureError>;

    /// Names of every collection in `database`.
    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, FixtureError>;

    /// Insert `documents` into `database.collection` as one ordered batch.
    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64, FixtureError>;

    /// Delete every document in `database.collection`, keeping the collection.
    async fn delete_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<u64, FixtureError>;

    /// Stream `reader` into the default GridFS bucket of `database`.
    ///
    /// Returns the number of bytes stored.
    async fn upload_file(
        &self,
        database: &str,
        upload: FileUpload,
        reader: UploadReader<'_>,
    ) -> Result<u64, FixtureError>;

    /// Drop both collections of GridFS `bucket` in `database`.
    async fn drop_file_bucket(&self, database: &str, bucket: &str) -> Result<(), FixtureError>;
}

/// [`FixtureStore`] backed by a MongoDB client.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with the given connection string.
    pub async fn connect(uri: &str) -> Result<Self, FixtureError> {
        tracing::debug!("Parsing MongoDB connection options from URI");
        let mut options = ClientOptions::parse(uri).await?;
        // Add connection timeout to prevent hanging
        options.connect_timeout = Some(Duration::from_secs(10));
        options.server_selection_timeout = Some(Duration::from_secs(10));
        let client = Client::with_options(options)?;
        tracing::debug!("MongoDB client created successfully");
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn database(&self, name: &str) -> Database {
        self.client.database(name)
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.database(database).collection(collection)
    }
}

#[async_trait]
impl FixtureStore for MongoStore {
    async fn list_database_names(&self) -> Result<Vec<String>, FixtureError> {
        Ok(self.client.list_database_names().await?)
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, FixtureError> {
        Ok(self.database(database).list_collection_names().await?)
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64, FixtureError> {
        // One session per operation, released when it drops.
        let mut session = self.client.start_session().await?;
        let result = self
            .collection(database, collection)
            .insert_many(documents)
            .session(&mut session)
            .await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn delete_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<u64, FixtureError> {
        let mut session = self.client.start_session().await?;
        let result = self
            .collection(database, collection)
            .delete_many(doc! {})
            .session(&mut session)
            .await?;
        Ok(result.deleted_count)
    }

    async fn upload_file(
        &self,
        database: &str,
        upload: FileUpload,
        reader: UploadReader<'_>,
    ) -> Result<u64, FixtureError> {
        let bucket = self.database(database).gridfs_bucket(None);
        let mut stream = bucket
            .open_upload_stream(&upload.filename)
            .id(upload.id)
            .chunk_size_bytes(upload.chunk_size_bytes)
            .metadata(upload.metadata)
            .await?;

        let copied = futures::io::copy(reader, &mut stream).await;
        let written = match copied {
            Ok(written) => written,
            Err(source) => {
                let aborted = stream.abort().await;
                return Err(upload_failed(upload.filename, source, aborted));
            }
        };
        stream
            .close()
            .await
            .map_err(|source| FixtureError::Upload {
                filename: upload.filename,
                source,
            })?;
        Ok(written)
    }

    async fn drop_file_bucket(&self, database: &str, bucket: &str) -> Result<(), FixtureError> {
        let options = GridFsBucketOptions::builder()
            .bucket_name(bucket.to_string())
            .build();
        self.database(database).gridfs_bucket(options).drop().await?;
        Ok(())
    }
}

/// The error for a failed upload stream. A failed abort is only logged so
/// the copy error stays the reported cause.
fn upload_failed(
    filename: String,
    source: std::io::Error,
    aborted: Result<(), mongodb::error::Error>,
) -> FixtureError {
    if let Err(abort_err) = aborted {
        tracing::warn!("Failed to abort upload of '{}': {}", filename, abort_err);
    }
    FixtureError::Upload { filename, source }
}

/// GridFS bucket names present among `collections`.
///
/// A bucket shows up as a `<name>.files` collection. The default bucket is
/// always included so an empty database still gets its `fs` bucket dropped.
pub fn file_buckets<S: AsRef<str>>(collections: &[S]) -> Vec<String> {
    let mut buckets = vec![DEFAULT_BUCKET.to_string()];
    for name in collections {
        if let Some(bucket) = name.as_ref().strip_suffix(FILES_SUFFIX) {
            if !bucket.is_empty() && !buckets.iter().any(|b| b == bucket) {
                buckets.push(bucket.to_string());
            }
        }
    }
    buckets
}
