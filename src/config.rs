//! Harness configuration (`evals.toml`).
//!
//! An optional `evals.toml` at the root of the scenarios directory tunes how
//! scripts are launched: the interpreter for each script family, the
//! validation timeout, the transcript filename, and extra environment
//! variables passed to every script.
//!
//! ```toml
//! [runner]
//! python = ["uv", "run"]
//! shell = ["bash"]
//! validation_timeout_seconds = 60
//! transcript = "latest-run.txt"
//!
//! [env]
//! DATABASE_URL = "sqlite://eval.db"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Filename of the harness config, relative to the scenarios directory.
pub const CONFIG_FILE: &str = "evals.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level harness configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Script launching settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Environment overrides applied to every setup and validation script.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// RunnerConfig
// ---------------------------------------------------------------------------

/// How scripts are launched.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Interpreter argv prefix for `.py` scripts (default: `uv run`).
    #[serde(default = "default_python")]
    pub python: Vec<String>,

    /// Interpreter argv prefix for every other script (default: `bash`).
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,

    /// Timeout for the validation phase, independent of the scenario's own
    /// timeout (default: 60).
    #[serde(default = "default_validation_timeout")]
    pub validation_timeout_seconds: u64,

    /// Transcript filename written into each scenario directory.
    #[serde(default = "default_transcript")]
    pub transcript: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            shell: default_shell(),
            validation_timeout_seconds: default_validation_timeout(),
            transcript: default_transcript(),
        }
    }
}

fn default_python() -> Vec<String> {
    vec!["uv".to_owned(), "run".to_owned()]
}

fn default_shell() -> Vec<String> {
    vec!["bash".to_owned()]
}

const fn default_validation_timeout() -> u64 {
    60
}

fn default_transcript() -> String {
    "latest-run.txt".to_owned()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a declaration or harness configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub(crate) fn at(mut self, path: &Path) -> Self {
        self.path = Some(path.to_owned());
        self
    }
}

impl HarnessConfig {
    /// Load `evals.toml` from a scenarios directory.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML, unknown fields, or an
    ///   empty interpreter, returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(scenarios_dir: &Path) -> Result<Self, ConfigError> {
        let path = scenarios_dir.join(CONFIG_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::new(format!("could not read file: {e}")).at(&path));
            }
        };
        Self::parse(&contents).map_err(|e| e.at(&path))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or an empty
    /// interpreter list.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = line_of(toml_str, span.start);
                message = format!("line {line}: {message}");
            }
            ConfigError::new(message)
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.python.is_empty() {
            return Err(ConfigError::new("runner.python must name an interpreter"));
        }
        if self.runner.shell.is_empty() {
            return Err(ConfigError::new("runner.shell must name an interpreter"));
        }
        if self.runner.validation_timeout_seconds == 0 {
            return Err(ConfigError::new(
                "runner.validation_timeout_seconds must be positive",
            ));
        }
        if self.runner.transcript.is_empty() || self.runner.transcript.contains(['/', '\\']) {
            return Err(ConfigError::new(
                "runner.transcript must be a plain filename",
            ));
        }
        Ok(())
    }
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = HarnessConfig::default();
        assert_eq!(cfg.runner.python, vec!["uv", "run"]);
        assert_eq!(cfg.runner.shell, vec!["bash"]);
        assert_eq!(cfg.runner.validation_timeout_seconds, 60);
        assert_eq!(cfg.runner.transcript, "latest-run.txt");
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn parse_empty_string() {
        let cfg = HarnessConfig::parse("").unwrap();
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[runner]
python = ["python3"]
shell = ["sh", "-e"]
validation_timeout_seconds = 15
transcript = "last.txt"

[env]
DATABASE_URL = "sqlite://eval.db"
"#;
        let cfg = HarnessConfig::parse(toml).unwrap();
        assert_eq!(cfg.runner.python, vec!["python3"]);
        assert_eq!(cfg.runner.shell, vec!["sh", "-e"]);
        assert_eq!(cfg.runner.validation_timeout_seconds, 15);
        assert_eq!(cfg.runner.transcript, "last.txt");
        assert_eq!(cfg.env.get("DATABASE_URL").map(String::as_str), Some("sqlite://eval.db"));
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let cfg = HarnessConfig::parse("[runner]\nvalidation_timeout_seconds = 5\n").unwrap();
        assert_eq!(cfg.runner.validation_timeout_seconds, 5);
        assert_eq!(cfg.runner.shell, vec!["bash"]);
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let err = HarnessConfig::parse("[scheduler]\nparallel = true\n").unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let err = HarnessConfig::parse("[runner]\nretries = 3\n").unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_empty_interpreter() {
        let err = HarnessConfig::parse("[runner]\nshell = []\n").unwrap_err();
        assert!(err.message.contains("runner.shell"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_zero_validation_timeout() {
        let err = HarnessConfig::parse("[runner]\nvalidation_timeout_seconds = 0\n").unwrap_err();
        assert!(err.message.contains("positive"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_transcript_path() {
        let err = HarnessConfig::parse("[runner]\ntranscript = \"../out.txt\"\n").unwrap_err();
        assert!(err.message.contains("plain filename"), "{}", err.message);
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let toml = "[runner]\nshell = [\"bash\"]\nvalidation_timeout_seconds = \"soon\"\n";
        let err = HarnessConfig::parse(toml).unwrap_err();
        assert!(err.message.contains("line 3"), "error should include line number: {}", err.message);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HarnessConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, HarnessConfig::default());
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = HarnessConfig::load(dir.path()).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError::new("bad");
        assert_eq!(err.to_string(), "config error: bad");
    }

    #[test]
    fn line_of_counts_newlines() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }
}
