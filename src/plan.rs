//! YAML fixture plans for driving the lifecycle outside a test harness.
//!
//! ```yaml
//! class:
//!   name: PeopleTest
//!   package: people
//!   fixtures:
//!     - kind: document
//!       collection: people
//!       files: [people.json]
//! methods:
//!   - name: lists_people
//!     cleanup: true
//! ```

use crate::fixture::{TestClass, TestMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Error type for plan loading.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Error reading plan file
    #[error("Failed to read fixture plan: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Method not found in plan
    #[error("Method '{method}' not found in class '{class}'")]
    MethodNotFound { class: String, method: String },
}

/// A test class and its methods, as read from a plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturePlan {
    pub class: TestClass,
    #[serde(default)]
    pub methods: Vec<TestMethod>,
}

impl FixturePlan {
    /// Load plan from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse plan from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn method(&self, name: &str) -> Result<&TestMethod, PlanError> {
        self.methods
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| PlanError::MethodNotFound {
                class: self.class.name.clone(),
                method: name.to_string(),
            })
    }
}
