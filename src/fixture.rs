//! Fixture declarations and the test class/method model they attach to.
//!
//! Declarations are plain values handed over by the host test framework.
//! The merge rule for one test method is: inherited classes (outermost
//! first), then the declaring class, then the method. Equal declarations
//! are loaded once, at their first position.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata used when a file fixture declares none.
pub const EMPTY_METADATA: &str = "{}";

fn empty_metadata() -> String {
    EMPTY_METADATA.to_string()
}

/// Documents to insert into one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFixture {
    /// Target database; `None` or empty resolves from configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub collection: String,
    /// Resource paths, one document (or array of documents) each.
    #[serde(default)]
    pub files: Vec<String>,
}

impl DocumentFixture {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            database: None,
            collection: collection.into(),
            files: Vec::new(),
        }
    }

    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }
}

/// A file to upload into GridFS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFixture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// ObjectId hex string stored as the file's `_id`.
    pub id: String,
    pub file_path: String,
    /// Extended JSON document attached as the file's metadata.
    #[serde(default = "empty_metadata")]
    pub metadata: String,
}

impl FileFixture {
    pub fn new(id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            database: None,
            id: id.into(),
            file_path: file_path.into(),
            metadata: empty_metadata(),
        }
    }

    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// One fixture attached to a test class or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixtureDeclaration {
    Document(DocumentFixture),
    File(FileFixture),
}

impl FixtureDeclaration {
    pub fn database(&self) -> Option<&str> {
        match self {
            FixtureDeclaration::Document(doc) => doc.database.as_deref(),
            FixtureDeclaration::File(file) => file.database.as_deref(),
        }
    }
}

impl From<DocumentFixture> for FixtureDeclaration {
    fn from(fixture: DocumentFixture) -> Self {
        FixtureDeclaration::Document(fixture)
    }
}

impl From<FileFixture> for FixtureDeclaration {
    fn from(fixture: FileFixture) -> Self {
        FixtureDeclaration::File(fixture)
    }
}

/// A test class with its class-level fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClass {
    pub name: String,
    /// Directory under the resource root that relative paths resolve against.
    #[serde(default)]
    pub package: PathBuf,
    #[serde(default)]
    pub fixtures: Vec<FixtureDeclaration>,
    /// Class whose fixtures are inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<TestClass>>,
}

impl TestClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_package(mut self, package: impl Into<PathBuf>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_fixture(mut self, fixture: impl Into<FixtureDeclaration>) -> Self {
        self.fixtures.push(fixture.into());
        self
    }

    pub fn extends(mut self, parent: TestClass) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// All class-level fixtures, inherited ones first, without duplicates.
    pub fn class_fixtures(&self) -> Vec<FixtureDeclaration> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            chain.push(parent);
            current = parent;
        }

        let mut merged = Vec::new();
        for class in chain.into_iter().rev() {
            push_unique(&mut merged, &class.fixtures);
        }
        merged
    }
}

/// A test method with its method-level fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMethod {
    pub name: String,
    /// Run a cleanup pass before this method's fixtures load.
    #[serde(default)]
    pub cleanup: bool,
    #[serde(default)]
    pub fixtures: Vec<FixtureDeclaration>,
}

impl TestMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_cleanup(mut self) -> Self {
        self.cleanup = true;
        self
    }

    pub fn with_fixture(mut self, fixture: impl Into<FixtureDeclaration>) -> Self {
        self.fixtures.push(fixture.into());
        self
    }

    /// Method-level fixtures without duplicates.
    pub fn method_fixtures(&self) -> Vec<FixtureDeclaration> {
        let mut merged = Vec::new();
        push_unique(&mut merged, &self.fixtures);
        merged
    }
}

fn push_unique(merged: &mut Vec<FixtureDeclaration>, fixtures: &[FixtureDeclaration]) {
    for fixture in fixtures {
        if !merged.contains(fixture) {
            merged.push(fixture.clone());
        }
    }
}
