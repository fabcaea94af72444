//! Fixture resource resolution for reading documents and files from disk
//!
//! Fixture declarations name their resources with short paths. This crate
//! turns those paths into concrete files under a resource root and reads
//! them either fully as text or as a stream.
//!
//! # Path Forms
//!
//! - `/files/test.png` - relative to the resource root
//! - `classpath:files/test.png` - same as above, prefix stripped
//! - `people.json` - relative to the test class's package directory
//! - `file:/tmp/people.json` - absolute filesystem path, root ignored
//!
//! # Example
//!
//! ```ignore
//! use mongo_fixtures_resource::ResourceLoader;
//!
//! let loader = ResourceLoader::new("tests/resources");
//! let resource = loader.resolve(Path::new("people"), "people.json");
//! let text = resource.read_to_string().await?;
//! ```

mod error;
mod local;

use std::path::{Path, PathBuf};

pub use error::ResourceError;
pub use local::ResourceStream;

const CLASSPATH_PREFIX: &str = "classpath:";
const FILE_PREFIX: &str = "file:";

/// A declared resource path, classified by how it is anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePath {
    /// Anchored at the resource root (`/x` or `classpath:x`)
    Rooted(PathBuf),
    /// Anchored at the test class's package directory
    Relative(PathBuf),
    /// Plain filesystem path (`file:` prefix)
    File(PathBuf),
}

impl ResourcePath {
    /// Classify a declared path string
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix(FILE_PREFIX) {
            ResourcePath::File(PathBuf::from(rest))
        } else if let Some(rest) = raw.strip_prefix(CLASSPATH_PREFIX) {
            ResourcePath::Rooted(PathBuf::from(rest.trim_start_matches('/')))
        } else if let Some(rest) = raw.strip_prefix('/') {
            ResourcePath::Rooted(PathBuf::from(rest.trim_start_matches('/')))
        } else {
            ResourcePath::Relative(PathBuf::from(raw))
        }
    }
}

/// Resolves declared resource paths against a resource root
#[derive(Debug, Clone)]
pub struct ResourceLoader {
    root: PathBuf,
}

impl ResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve one declared path for a test class living in `package`
    pub fn resolve(&self, package: &Path, raw: &str) -> Resource {
        let path = match ResourcePath::parse(raw) {
            ResourcePath::Rooted(rel) => self.root.join(rel),
            ResourcePath::Relative(rel) => self.root.join(package).join(rel),
            ResourcePath::File(abs) => abs,
        };
        tracing::trace!("Resolved resource '{}' to {}", raw, path.display());
        Resource {
            declared: raw.to_string(),
            path,
        }
    }

    /// Resolve declared paths, preserving their order
    pub fn resolve_all<S: AsRef<str>>(&self, package: &Path, raws: &[S]) -> Vec<Resource> {
        raws.iter()
            .map(|raw| self.resolve(package, raw.as_ref()))
            .collect()
    }
}

/// A resolved resource ready for reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    declared: String,
    path: PathBuf,
}

impl Resource {
    /// Build a resource directly from a filesystem path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            declared: path.display().to_string(),
            path,
        }
    }

    /// The path as written in the fixture declaration
    pub fn declared(&self) -> &str {
        &self.declared
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// The resource's file name, used as the stored name in GridFS
    pub fn filename(&self) -> Result<&str, ResourceError> {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ResourceError::MissingName {
                path: self.path.clone(),
            })
    }

    /// Read the whole resource as UTF-8 text
    pub async fn read_to_string(&self) -> Result<String, ResourceError> {
        local::read_to_string(&self.path).await
    }

    /// Open the resource as a stream without buffering it in memory
    pub async fn open(&self) -> Result<ResourceStream, ResourceError> {
        local::open(&self.path).await
    }
}
