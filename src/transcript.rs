//! Per-scenario run transcript (`latest-run.txt`).
//!
//! A [`Transcript`] accumulates the header, phase banners, and captured output
//! of one run, and is written exactly once: either by [`Transcript::finalize`]
//! from a terminal state, or by its `Drop` impl with an `INTERRUPTED` status
//! if the run unwound before reaching one. Each write replaces the previous
//! transcript; no history is kept.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::descriptor::ScenarioDescriptor;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Phase banners, in the order they appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The setup script.
    Setup,
    /// The validation script.
    Validation,
}

impl Phase {
    /// Banner line written before the phase's output.
    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Self::Setup => "--- Scenario Execution ---",
            Self::Validation => "--- Validation ---",
        }
    }
}

/// Terminal status recorded on the transcript's `Status:` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptStatus {
    /// Validation ran and succeeded.
    Passed,
    /// Setup succeeded and no validator exists.
    PassedUnvalidated,
    /// Setup or validation failed.
    Failed,
    /// The run unwound before reaching a terminal state.
    Interrupted,
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::PassedUnvalidated => write!(f, "PASSED (no validation)"),
            Self::Failed => write!(f, "FAILED"),
            Self::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// An in-progress transcript bound to its output path.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    lines: Vec<String>,
    written: bool,
}

impl Transcript {
    /// Start a transcript with the scenario header.
    #[must_use]
    pub fn begin(path: PathBuf, descriptor: &ScenarioDescriptor) -> Self {
        let mut lines = vec![
            format!("=== Scenario: {} ===", descriptor.name),
            format!("Description: {}", descriptor.description),
        ];
        if !descriptor.tags.is_empty() {
            let tags: Vec<&str> = descriptor.tags.iter().map(String::as_str).collect();
            lines.push(format!("Tags: {}", tags.join(", ")));
        }
        lines.push(format!("Timeout: {}s", descriptor.timeout_seconds));
        lines.push(format!("Started at: {}", now()));
        lines.push(String::new());
        Self {
            path,
            lines,
            written: false,
        }
    }

    /// Where the transcript will be written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a phase banner followed by that phase's output.
    pub fn phase(&mut self, phase: Phase, output: &str) {
        self.lines.push(phase.banner().to_owned());
        self.lines.push(output.trim_end_matches('\n').to_owned());
        self.lines.push(String::new());
    }

    /// Append the status block and write the transcript, replacing any
    /// previous one.
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be written. The transcript is
    /// considered finalized either way.
    pub fn finalize(
        mut self,
        status: TranscriptStatus,
        duration: Duration,
        error: Option<&str>,
    ) -> io::Result<()> {
        self.write(status, Some(duration), error)
    }

    fn write(
        &mut self,
        status: TranscriptStatus,
        duration: Option<Duration>,
        error: Option<&str>,
    ) -> io::Result<()> {
        self.written = true;
        self.lines.push(format!("Status: {status}"));
        if let Some(duration) = duration {
            self.lines.push(format!("Duration: {:.1}s", duration.as_secs_f64()));
        }
        if let Some(error) = error {
            self.lines.push(format!("Error: {error}"));
        }
        self.lines.push(format!("Finished at: {}", now()));

        let mut text = self.lines.join("\n");
        text.push('\n');
        std::fs::write(&self.path, text)
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        if let Err(e) = self.write(TranscriptStatus::Interrupted, None, None) {
            warn!(path = %self.path.display(), error = %e, "failed to write interrupted transcript");
        }
    }
}

fn now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
