//! Harness error types.
//!
//! [`HarnessError`] covers the failures that abort a run before or instead of
//! producing a [`ScenarioResult`](crate::runner::ScenarioResult): a scenario
//! that cannot be found, or a declaration/config file that cannot be parsed.
//! Script failures and timeouts are never errors at this level; the runner
//! folds them into a failed result instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Fatal errors for a harness run.
///
/// Each variant is rendered as a single `Error:` line by the binary, followed
/// by whatever hints [`HarnessError::hints`] returns.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No directory with the requested name exists under the scenarios root.
    #[error("Scenario '{name}' not found")]
    ScenarioNotFound {
        /// The requested scenario name.
        name: String,
        /// The scenarios root that was searched.
        searched: PathBuf,
        /// Sibling directories that do contain a declaration file.
        available: Vec<String>,
    },

    /// The directory exists but has no declaration file.
    #[error("'{name}' is not a valid scenario")]
    NotAScenario {
        /// The requested scenario name.
        name: String,
        /// Where the declaration file was expected.
        expected: PathBuf,
    },

    /// A declaration or harness config file is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HarnessError {
    /// Follow-up lines that help the user recover: the searched path and the
    /// scenarios that do exist, or the missing declaration path.
    #[must_use]
    pub fn hints(&self) -> Vec<String> {
        match self {
            Self::ScenarioNotFound {
                searched,
                available,
                ..
            } => {
                let mut lines = vec![format!("Looking in: {}", searched.display())];
                if !available.is_empty() {
                    lines.push(String::new());
                    lines.push("Available scenarios:".to_owned());
                    lines.extend(available.iter().map(|name| format!("  - {name}")));
                }
                lines
            }
            Self::NotAScenario { expected, .. } => {
                vec![format!("Missing: {}", expected.display())]
            }
            Self::Config(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_hints_list_available_scenarios() {
        let err = HarnessError::ScenarioNotFound {
            name: "missing".into(),
            searched: PathBuf::from("/evals/scenarios"),
            available: vec!["basic-migration".into(), "plugin-install".into()],
        };
        assert_eq!(err.to_string(), "Scenario 'missing' not found");
        let hints = err.hints();
        assert_eq!(hints[0], "Looking in: /evals/scenarios");
        assert!(hints.contains(&"Available scenarios:".to_owned()));
        assert!(hints.contains(&"  - basic-migration".to_owned()));
        assert!(hints.contains(&"  - plugin-install".to_owned()));
    }

    #[test]
    fn not_found_without_siblings_only_names_the_root() {
        let err = HarnessError::ScenarioNotFound {
            name: "x".into(),
            searched: PathBuf::from("/empty"),
            available: Vec::new(),
        };
        assert_eq!(err.hints(), vec!["Looking in: /empty".to_owned()]);
    }

    #[test]
    fn not_a_scenario_names_expected_file() {
        let err = HarnessError::NotAScenario {
            name: "todo".into(),
            expected: PathBuf::from("/s/todo/scenario.yaml"),
        };
        assert_eq!(err.to_string(), "'todo' is not a valid scenario");
        assert_eq!(err.hints(), vec!["Missing: /s/todo/scenario.yaml".to_owned()]);
    }

    #[test]
    fn config_error_is_transparent() {
        let err = HarnessError::from(ConfigError {
            path: Some(PathBuf::from("scenario.yaml")),
            message: "missing field `name`".into(),
        });
        assert_eq!(err.to_string(), "scenario.yaml: missing field `name`");
        assert!(err.hints().is_empty());
    }
}
