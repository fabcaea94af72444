//! Cleanup pass run before a test method that opts into it.
//!
//! The pass covers every database the server reports, not just the ones
//! this run's loaders wrote to, so fixtures left behind by an interrupted
//! earlier run do not leak into the next test. Reserved system databases
//! are never touched.
//!
//! Documents are deleted collection by collection rather than dropping the
//! database, so collections and their indexes survive. `system.*`
//! collections are skipped. GridFS buckets are dropped outright, which
//! removes both file documents and chunks.

use crate::context::TestContext;
use crate::error::FixtureError;
use crate::store::file_buckets;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Databases the cleanup pass never enumerates or modifies.
pub const RESERVED_DATABASES: [&str; 3] = ["config", "admin", "local"];

/// Prefix of server-managed collections such as `system.views`.
pub const SYSTEM_COLLECTION_PREFIX: &str = "system.";

pub fn is_reserved(database: &str) -> bool {
    RESERVED_DATABASES.contains(&database)
}

pub fn is_system_collection(collection: &str) -> bool {
    collection.starts_with(SYSTEM_COLLECTION_PREFIX)
}

/// Databases a loader has written to since the last cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedDatabases(BTreeSet<String>);

impl TouchedDatabases {
    pub fn insert(&mut self, database: &str) {
        self.0.insert(database.to_string());
    }

    pub fn contains(&self, database: &str) -> bool {
        self.0.contains(database)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Empty the set, returning what it held.
    pub fn take(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.0)
    }
}

/// What one cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub databases: Vec<String>,
    pub documents_deleted: u64,
    pub buckets_dropped: usize,
}

/// Clears document collections and GridFS buckets across the server.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanupCoordinator;

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Databases in scope for a pass: everything the server lists plus
    /// anything a loader touched, minus the reserved names.
    pub async fn target_databases(
        &self,
        context: &TestContext<'_>,
        touched: &[&TouchedDatabases],
    ) -> Result<Vec<String>, FixtureError> {
        let mut targets: BTreeSet<String> = context
            .store
            .list_database_names()
            .await?
            .into_iter()
            .collect();
        for set in touched {
            targets.extend(set.iter().map(str::to_string));
        }
        Ok(targets
            .into_iter()
            .filter(|name| !is_reserved(name))
            .collect())
    }

    /// Delete all documents from every non-system collection of each
    /// database.
    pub async fn clear_documents(
        &self,
        context: &TestContext<'_>,
        databases: &[String],
    ) -> Result<u64, FixtureError> {
        let mut deleted = 0;
        for database in databases {
            for collection in context.store.list_collection_names(database).await? {
                if is_system_collection(&collection) {
                    debug!("Skipping system collection {}.{}", database, collection);
                    continue;
                }
                let count = context
                    .store
                    .delete_all_documents(database, &collection)
                    .await?;
                debug!("Deleted {} documents from {}.{}", count, database, collection);
                deleted += count;
            }
        }
        Ok(deleted)
    }

    /// Drop every GridFS bucket of each database.
    pub async fn drop_file_buckets(
        &self,
        context: &TestContext<'_>,
        databases: &[String],
    ) -> Result<usize, FixtureError> {
        let mut dropped = 0;
        for database in databases {
            let collections = context.store.list_collection_names(database).await?;
            for bucket in file_buckets(&collections) {
                context.store.drop_file_bucket(database, &bucket).await?;
                debug!("Dropped GridFS bucket {}.{}", database, bucket);
                dropped += 1;
            }
        }
        Ok(dropped)
    }

    /// Run a full pass and reset the touched sets.
    ///
    /// Errors propagate immediately; a half-cleaned server fails the test
    /// and the touched sets are kept for the next attempt.
    pub async fn cleanup(
        &self,
        context: &TestContext<'_>,
        documents: &mut TouchedDatabases,
        files: &mut TouchedDatabases,
    ) -> Result<CleanupReport, FixtureError> {
        let databases = self.target_databases(context, &[&*documents, &*files]).await?;
        let documents_deleted = self.clear_documents(context, &databases).await?;
        let buckets_dropped = self.drop_file_buckets(context, &databases).await?;
        documents.take();
        files.take();

        info!(
            "Cleanup complete: {} documents deleted, {} buckets dropped across {} databases",
            documents_deleted,
            buckets_dropped,
            databases.len()
        );
        Ok(CleanupReport {
            databases,
            documents_deleted,
            buckets_dropped,
        })
    }
}
