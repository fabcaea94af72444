//! MongoFixtures Library
//!
//! Seeds MongoDB with document and GridFS file fixtures before integration
//! tests run, and wipes them again on request.
//!
//! # Features
//!
//! - Document fixtures: Extended JSON resources inserted into a collection
//! - File fixtures: resources streamed into GridFS with an id and metadata
//! - Cleanup: delete all documents and drop all GridFS buckets on the server,
//!   skipping `admin`, `config` and `local`
//! - Database resolution: per-fixture name, `mongodb.database`, or the
//!   database in `mongodb.uri`
//!
//! # Usage
//!
//! ```ignore
//! use mongo_fixtures::{
//!     DocumentFixture, FixtureListener, MongoStore, ResourceLoader, TestClass, TestContext,
//!     TestMethod,
//! };
//!
//! let store = MongoStore::connect("mongodb://localhost:27017").await?;
//! let config = mongo_fixtures::EnvConfig;
//! let resources = ResourceLoader::new("tests/resources");
//!
//! let class = TestClass::new("PeopleTest")
//!     .with_fixture(DocumentFixture::new("people").with_file("/people.json"));
//! let method = TestMethod::new("lists_people").with_cleanup();
//!
//! let mut listener = FixtureListener::new();
//! let context = TestContext::new(&class, &config, &store, &resources).for_method(&method);
//! listener.before_test_method(&context).await?;
//! ```
//!
//! Tests are expected to run one at a time against a given server.

pub mod cleanup;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod fixture;
pub mod gridfs;
pub mod listener;
pub mod plan;
pub mod store;
pub mod testing;

pub use cleanup::{CleanupCoordinator, CleanupReport, TouchedDatabases, RESERVED_DATABASES};
pub use config::{resolve_database_name, ConfigSource, EnvConfig, Layered, DATABASE_KEY, URI_KEY};
pub use context::TestContext;
pub use document::DocumentFixtureLoader;
pub use error::FixtureError;
pub use fixture::{DocumentFixture, FileFixture, FixtureDeclaration, TestClass, TestMethod};
pub use gridfs::{FileFixtureLoader, CHUNK_SIZE_BYTES};
pub use listener::{FixtureListener, LifecyclePhase, PreparationReport};
pub use plan::{FixturePlan, PlanError};
pub use store::{FileUpload, FixtureStore, MongoStore};

pub use mongo_fixtures_resource::{Resource, ResourceError, ResourceLoader};
