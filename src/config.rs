//! Fixture configuration sources and database name resolution.
//!
//! The target database of a fixture is resolved in this order:
//!
//! 1. the database named on the fixture declaration itself
//! 2. the `mongodb.database` setting
//! 3. the database path component of the `mongodb.uri` setting
//!
//! When none of these yields a name, loading fails with
//! [`FixtureError::UnspecifiedDatabase`].

use crate::error::FixtureError;
use mongodb::options::ConnectionString;
use std::collections::{BTreeMap, HashMap};

/// Setting holding the database name directly.
pub const DATABASE_KEY: &str = "mongodb.database";

/// Setting holding a MongoDB connection string.
pub const URI_KEY: &str = "mongodb.uri";

/// Key/value lookup over the host's configuration environment.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Reads settings from process environment variables.
///
/// `mongodb.database` is looked up as `MONGODB_DATABASE`, `mongodb.uri` as
/// `MONGODB_URI`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl EnvConfig {
    pub fn variable_name(key: &str) -> String {
        key.replace(['.', '-'], "_").to_uppercase()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

/// Queries sources in order; the first one with a value wins.
#[derive(Default)]
pub struct Layered {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Layered {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ConfigSource for Layered {
    fn get(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.get(key))
    }
}

/// Resolve the database a fixture targets.
///
/// A non-empty `explicit` name always wins over configuration.
pub fn resolve_database_name(
    explicit: Option<&str>,
    config: &dyn ConfigSource,
) -> Result<String, FixtureError> {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }
    if let Some(name) = config.get(DATABASE_KEY) {
        return Ok(name);
    }
    if let Some(uri) = config.get(URI_KEY) {
        return database_from_uri(&uri);
    }
    Err(FixtureError::UnspecifiedDatabase)
}

/// Extract the default database from a connection string.
pub fn database_from_uri(uri: &str) -> Result<String, FixtureError> {
    let parsed = ConnectionString::parse(uri).map_err(FixtureError::InvalidConnectionString)?;
    parsed
        .default_database
        .filter(|name| !name.is_empty())
        .ok_or(FixtureError::UnspecifiedDatabase)
}
