//! Read-only view of the test being prepared.

use crate::config::{resolve_database_name, ConfigSource};
use crate::error::FixtureError;
use crate::fixture::{TestClass, TestMethod};
use crate::store::FixtureStore;
use mongo_fixtures_resource::{Resource, ResourceLoader};

/// Everything the host test framework hands over for one test.
///
/// The framework owns all of it; the lifecycle only borrows.
#[derive(Clone, Copy)]
pub struct TestContext<'a> {
    pub test_class: &'a TestClass,
    /// `None` when only class-level fixtures are being prepared.
    pub test_method: Option<&'a TestMethod>,
    pub config: &'a dyn ConfigSource,
    pub store: &'a dyn FixtureStore,
    pub resources: &'a ResourceLoader,
}

impl<'a> TestContext<'a> {
    pub fn new(
        test_class: &'a TestClass,
        config: &'a dyn ConfigSource,
        store: &'a dyn FixtureStore,
        resources: &'a ResourceLoader,
    ) -> Self {
        Self {
            test_class,
            test_method: None,
            config,
            store,
            resources,
        }
    }

    pub fn for_method(mut self, test_method: &'a TestMethod) -> Self {
        self.test_method = Some(test_method);
        self
    }

    /// Whether the current method asked for a cleanup pass.
    pub fn wants_cleanup(&self) -> bool {
        self.test_method.is_some_and(|m| m.cleanup)
    }

    /// Resolve a declared resource path relative to the test class.
    pub fn resource(&self, path: &str) -> Resource {
        self.resources.resolve(&self.test_class.package, path)
    }

    pub fn resolve_database(&self, explicit: Option<&str>) -> Result<String, FixtureError> {
        resolve_database_name(explicit, self.config)
    }
}
