//! In-memory [`FixtureStore`] for exercising the lifecycle without a server.
//!
//! GridFS is modelled the way MongoDB lays it out: an upload writes one
//! document into `<bucket>.files` and its bytes, split into chunks, into
//! `<bucket>.chunks`. Every mutating call is recorded in an operation log
//! so tests can assert on ordering.
//!
//! Like the server, the store enforces a unique `_id` per collection and
//! fills in a generated ObjectId when a document has none. Inserts are
//! ordered: documents before a duplicate stay inserted. Failures of any
//! call can be forced with [`InMemoryStore::fail_on`].

use crate::error::FixtureError;
use crate::store::{FileUpload, FixtureStore, UploadReader, CHUNKS_SUFFIX, DEFAULT_BUCKET, FILES_SUFFIX};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use futures::AsyncReadExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// A mutating call made against an [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Insert {
        database: String,
        collection: String,
        count: usize,
    },
    DeleteAll {
        database: String,
        collection: String,
    },
    Upload {
        database: String,
        filename: String,
    },
    DropBucket {
        database: String,
        bucket: String,
    },
}

/// A [`FixtureStore`] call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreCall {
    ListDatabaseNames,
    ListCollectionNames,
    InsertDocuments,
    DeleteAllDocuments,
    UploadFile,
    DropFileBucket,
}

/// A stored GridFS file, reassembled from its files and chunks documents.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: Bson,
    pub filename: String,
    pub length: u64,
    pub chunk_size_bytes: u32,
    pub metadata: Document,
    pub data: Vec<u8>,
}

type Databases = BTreeMap<String, BTreeMap<String, Vec<Document>>>;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    databases: Mutex<Databases>,
    ops: Mutex<Vec<StoreOp>>,
    failing: Mutex<BTreeSet<StoreCall>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection, e.g. to mimic the `admin` database.
    pub fn create_collection(&self, database: &str, collection: &str) {
        self.lock_databases()
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
    }

    /// Make every later `call` fail with a MongoDB error.
    pub fn fail_on(&self, call: StoreCall) {
        lock(&self.failing).insert(call);
    }

    /// Seed documents without recording an operation or checking ids.
    pub fn seed(&self, database: &str, collection: &str, documents: Vec<Document>) {
        self.lock_databases()
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Documents currently stored in `database.collection`.
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock_databases()
            .get(database)
            .and_then(|db| db.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_exists(&self, database: &str, collection: &str) -> bool {
        self.lock_databases()
            .get(database)
            .is_some_and(|db| db.contains_key(collection))
    }

    /// Look up a file in the default bucket by id.
    pub fn find_file(&self, database: &str, id: &Bson) -> Option<StoredFile> {
        let databases = self.lock_databases();
        let db = databases.get(database)?;
        let files = db.get(&format!("{DEFAULT_BUCKET}{FILES_SUFFIX}"))?;
        let file = files.iter().find(|f| f.get("_id") == Some(id))?;

        let mut chunks: Vec<&Document> = db
            .get(&format!("{DEFAULT_BUCKET}{CHUNKS_SUFFIX}"))
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.get("files_id") == Some(id))
                    .collect()
            })
            .unwrap_or_default();
        chunks.sort_by_key(|c| c.get_i32("n").unwrap_or_default());
        let data = chunks
            .iter()
            .filter_map(|c| c.get_binary_generic("data").ok())
            .flatten()
            .copied()
            .collect();

        Some(StoredFile {
            id: id.clone(),
            filename: file.get_str("filename").unwrap_or_default().to_string(),
            length: file.get_i64("length").unwrap_or_default() as u64,
            chunk_size_bytes: file.get_i32("chunkSize").unwrap_or_default() as u32,
            metadata: file.get_document("metadata").cloned().unwrap_or_default(),
            data,
        })
    }

    /// Every mutating call so far, in order.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock_ops().clone()
    }

    pub fn clear_operations(&self) {
        self.lock_ops().clear();
    }

    fn record(&self, op: StoreOp) {
        self.lock_ops().push(op);
    }

    fn check(&self, call: StoreCall) -> Result<(), FixtureError> {
        if lock(&self.failing).contains(&call) {
            return Err(mongodb::error::Error::custom(format!("{call:?} failed")).into());
        }
        Ok(())
    }

    /// Append `documents` in order, stopping at the first duplicate `_id`.
    fn insert_ordered(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, FixtureError> {
        let mut databases = self.lock_databases();
        let stored = databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        let mut inserted = 0;
        for mut document in documents {
            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            let id = document.get("_id").cloned().unwrap_or(Bson::Null);
            if stored.iter().any(|d| d.get("_id") == Some(&id)) {
                return Err(duplicate_key(database, collection, &id));
            }
            stored.push(document);
            inserted += 1;
        }
        Ok(inserted)
    }

    fn lock_databases(&self) -> MutexGuard<'_, Databases> {
        lock(&self.databases)
    }

    fn lock_ops(&self) -> MutexGuard<'_, Vec<StoreOp>> {
        lock(&self.ops)
    }
}

// A panic while holding the lock only happens inside a failing test.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Error with the server's E11000 message for a duplicate `_id`.
fn duplicate_key(database: &str, collection: &str, id: &Bson) -> FixtureError {
    mongodb::error::Error::custom(format!(
        "E11000 duplicate key error collection: {database}.{collection} index: _id_ dup key: {{ _id: {id} }}"
    ))
    .into()
}

#[async_trait]
impl FixtureStore for InMemoryStore {
    async fn list_database_names(&self) -> Result<Vec<String>, FixtureError> {
        self.check(StoreCall::ListDatabaseNames)?;
        Ok(self.lock_databases().keys().cloned().collect())
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>, FixtureError> {
        self.check(StoreCall::ListCollectionNames)?;
        Ok(self
            .lock_databases()
            .get(database)
            .map(|db| db.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<u64, FixtureError> {
        self.check(StoreCall::InsertDocuments)?;
        let count = self.insert_ordered(database, collection, documents)?;
        self.record(StoreOp::Insert {
            database: database.to_string(),
            collection: collection.to_string(),
            count,
        });
        Ok(count as u64)
    }

    async fn delete_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<u64, FixtureError> {
        self.check(StoreCall::DeleteAllDocuments)?;
        let deleted = self
            .lock_databases()
            .get_mut(database)
            .and_then(|db| db.get_mut(collection))
            .map(|docs| docs.drain(..).count())
            .unwrap_or_default();
        self.record(StoreOp::DeleteAll {
            database: database.to_string(),
            collection: collection.to_string(),
        });
        Ok(deleted as u64)
    }

    async fn upload_file(
        &self,
        database: &str,
        upload: FileUpload,
        mut reader: UploadReader<'_>,
    ) -> Result<u64, FixtureError> {
        self.check(StoreCall::UploadFile)?;
        let files_collection = format!("{DEFAULT_BUCKET}{FILES_SUFFIX}");
        if self
            .documents(database, &files_collection)
            .iter()
            .any(|f| f.get("_id") == Some(&upload.id))
        {
            return Err(duplicate_key(database, &files_collection, &upload.id));
        }

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|source| FixtureError::Upload {
                filename: upload.filename.clone(),
                source,
            })?;

        let chunk_size = upload.chunk_size_bytes.max(1) as usize;
        let chunks: Vec<Document> = data
            .chunks(chunk_size)
            .enumerate()
            .map(|(n, bytes)| {
                doc! {
                    "files_id": upload.id.clone(),
                    "n": n as i32,
                    "data": Binary { subtype: BinarySubtype::Generic, bytes: bytes.to_vec() },
                }
            })
            .collect();
        let file = doc! {
            "_id": upload.id.clone(),
            "length": data.len() as i64,
            "chunkSize": upload.chunk_size_bytes as i32,
            "filename": upload.filename.clone(),
            "metadata": upload.metadata.clone(),
        };

        self.seed(database, &files_collection, vec![file]);
        self.seed(database, &format!("{DEFAULT_BUCKET}{CHUNKS_SUFFIX}"), chunks);
        self.record(StoreOp::Upload {
            database: database.to_string(),
            filename: upload.filename,
        });
        Ok(data.len() as u64)
    }

    async fn drop_file_bucket(&self, database: &str, bucket: &str) -> Result<(), FixtureError> {
        self.check(StoreCall::DropFileBucket)?;
        if let Some(db) = self.lock_databases().get_mut(database) {
            db.remove(&format!("{bucket}{FILES_SUFFIX}"));
            db.remove(&format!("{bucket}{CHUNKS_SUFFIX}"));
        }
        self.record(StoreOp::DropBucket {
            database: database.to_string(),
            bucket: bucket.to_string(),
        });
        Ok(())
    }
}
