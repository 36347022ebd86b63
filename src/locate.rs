//! Scenario discovery.
//!
//! A scenario is a direct subdirectory of the scenarios root that contains a
//! declaration file. Resolution is all-or-nothing: a name either maps to one
//! valid scenario directory or the run stops with a [`HarnessError`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::descriptor::DECLARATION_FILE;
use crate::error::HarnessError;

/// Resolve `name` to its scenario directory under `scenarios_dir`.
///
/// # Errors
/// - [`HarnessError::ScenarioNotFound`] if no such directory exists, listing
///   the scenarios that do.
/// - [`HarnessError::NotAScenario`] if the directory has no declaration file.
pub fn locate_scenario(scenarios_dir: &Path, name: &str) -> Result<PathBuf, HarnessError> {
    let scenario_dir = scenarios_dir.join(name);
    if !is_plain_name(name) || !scenario_dir.is_dir() {
        return Err(HarnessError::ScenarioNotFound {
            name: name.to_owned(),
            searched: scenarios_dir.to_owned(),
            available: available_scenarios(scenarios_dir),
        });
    }

    let declaration = scenario_dir.join(DECLARATION_FILE);
    if !declaration.is_file() {
        return Err(HarnessError::NotAScenario {
            name: name.to_owned(),
            expected: declaration,
        });
    }

    debug!(scenario = name, dir = %scenario_dir.display(), "located scenario");
    Ok(scenario_dir)
}

/// Sorted names of every subdirectory that holds a declaration file.
///
/// An unreadable scenarios root yields an empty list; the caller is already
/// reporting a failure and only wants suggestions.
#[must_use]
pub fn available_scenarios(scenarios_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(scenarios_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().join(DECLARATION_FILE).is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// A scenario name must be a single path component.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
