//! Scenario declarations (`scenario.yaml`).
//!
//! The declaration is parsed into a loosely typed [`RawDescriptor`] first and
//! then validated into the strict [`ScenarioDescriptor`]. Nothing optional or
//! unchecked leaks past [`ScenarioDescriptor::parse`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::config::ConfigError;

/// Filename of the declaration inside each scenario directory.
pub const DECLARATION_FILE: &str = "scenario.yaml";

/// Timeout applied to the setup phase when the declaration omits one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// A validated scenario declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioDescriptor {
    /// Non-empty scenario name, reported in results and transcripts.
    pub name: String,
    /// Free-form description; empty when not declared.
    pub description: String,
    /// Setup-phase timeout in seconds; always positive.
    pub timeout_seconds: u64,
    /// Tags, de-duplicated and sorted.
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "timeout_seconds")]
    timeout: Option<u64>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl ScenarioDescriptor {
    /// Read and validate a declaration file.
    ///
    /// # Errors
    /// Returns `ConfigError` (carrying `path`) when the file cannot be read,
    /// is not valid YAML, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("could not read file: {e}")).at(path))?;
        Self::parse(&contents).map_err(|e| e.at(path))
    }

    /// Parse and validate a declaration from a YAML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed YAML, unknown keys, a missing or
    /// empty `name`, or a non-positive `timeout`.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Err(ConfigError::new("declaration is empty"));
        }
        let raw: RawDescriptor =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::new(e.to_string()))?;
        raw.try_into()
    }
}

impl TryFrom<RawDescriptor> for ScenarioDescriptor {
    type Error = ConfigError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let name = raw
            .name
            .ok_or_else(|| ConfigError::new("missing required field `name`"))?;
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(ConfigError::new("field `name` must not be empty"));
        }

        let timeout_seconds = match raw.timeout {
            None => DEFAULT_TIMEOUT_SECONDS,
            Some(0) => return Err(ConfigError::new("field `timeout` must be positive")),
            Some(t) => t,
        };

        Ok(Self {
            name,
            description: raw.description.unwrap_or_default(),
            timeout_seconds,
            tags: raw.tags.unwrap_or_default().into_iter().collect(),
        })
    }
}
