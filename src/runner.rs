//! Two-phase scenario runner.
//!
//! ```text
//! Pending -> Running(setup) -> Failed
//!                           -> Running(validate) -> Passed | Failed
//!                           -> Passed                 (no validator)
//! ```
//!
//! A failure in either phase ends the scenario; nothing is retried. Every
//! terminal branch goes through [`ScenarioRunner::finish`], which writes the
//! transcript before the [`ScenarioResult`] is returned.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::HarnessConfig;
use crate::descriptor::ScenarioDescriptor;
use crate::exec::{ExecutionOutcome, ScriptExecutor};
use crate::transcript::{Phase, Transcript, TranscriptStatus};

/// Setup script candidates, tried in order.
pub const SETUP_CANDIDATES: &[&str] = &["scenario.py", "scenario.sh"];

/// Validation script candidates, tried in order.
pub const VALIDATE_CANDIDATES: &[&str] = &["validate.py", "validate.sh"];

/// `validation_output` of a scenario that has no validator.
pub const NO_VALIDATION_SCRIPT: &str = "No validation script found";

/// Prefix of `error_message` when the setup phase fails.
pub const SETUP_FAILED: &str = "Scenario execution failed";

/// How much setup output (in bytes, from the end) is kept in `error_message`.
pub const ERROR_OUTPUT_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// ScenarioResult
// ---------------------------------------------------------------------------

/// Outcome of one full scenario run. Serialized as-is in the JSON report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// Scenario name from the declaration.
    pub name: String,
    /// Scenario description from the declaration.
    pub description: String,
    /// Whether the scenario passed.
    pub passed: bool,
    /// Wall-clock seconds from the start of setup to the terminal state.
    pub duration_seconds: f64,
    /// Set only when the setup phase failed.
    pub error_message: Option<String>,
    /// Validator output, [`NO_VALIDATION_SCRIPT`], or empty if validation
    /// never ran.
    pub validation_output: String,
    /// Tags from the declaration.
    pub tags: BTreeSet<String>,
}

impl ScenarioResult {
    fn new(descriptor: &ScenarioDescriptor, passed: bool, duration: Duration) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            passed,
            duration_seconds: duration.as_secs_f64(),
            error_message: None,
            validation_output: String::new(),
            tags: descriptor.tags.clone(),
        }
    }

    /// The reason shown in the failure list of the report.
    #[must_use]
    pub fn failure_reason(&self) -> &str {
        self.error_message.as_deref().unwrap_or("Validation failed")
    }
}

// ---------------------------------------------------------------------------
// Script lookup
// ---------------------------------------------------------------------------

/// The first candidate that exists in `dir`.
#[must_use]
pub fn find_script(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Like [`find_script`], but falls back to the last candidate so the executor
/// can report exactly which file is missing.
#[must_use]
pub fn resolve_script(dir: &Path, candidates: &[&str]) -> PathBuf {
    find_script(dir, candidates).unwrap_or_else(|| {
        dir.join(candidates.last().copied().unwrap_or_default())
    })
}

/// Keep the tail of `output`, at most `limit` bytes, cut on a char boundary.
#[must_use]
pub fn truncate_output(output: &str, limit: usize) -> String {
    let output = output.trim_end();
    if output.len() <= limit {
        return output.to_owned();
    }
    let mut start = output.len() - limit;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    format!("... (truncated)\n{}", &output[start..])
}

// ---------------------------------------------------------------------------
// ScenarioRunner
// ---------------------------------------------------------------------------

/// Runs scenarios one at a time through the setup/validate protocol.
#[derive(Clone, Debug)]
pub struct ScenarioRunner {
    executor: ScriptExecutor,
    validation_timeout: Duration,
    transcript_name: String,
    verbose: bool,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new(&HarnessConfig::default())
    }
}

impl ScenarioRunner {
    /// Build a runner from the harness configuration.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            executor: ScriptExecutor::new(config),
            validation_timeout: Duration::from_secs(config.runner.validation_timeout_seconds),
            transcript_name: config.runner.transcript.clone(),
            verbose: false,
        }
    }

    /// Echo each phase's output to stderr as it completes.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Path of the transcript written for `scenario_dir`.
    #[must_use]
    pub fn transcript_path(&self, scenario_dir: &Path) -> PathBuf {
        scenario_dir.join(&self.transcript_name)
    }

    /// Run one scenario to a terminal state.
    #[must_use]
    pub fn run(&self, scenario_dir: &Path, descriptor: &ScenarioDescriptor) -> ScenarioResult {
        let span = info_span!("scenario", name = %descriptor.name);
        let _enter = span.enter();
        let start = Instant::now();
        let mut transcript = Transcript::begin(self.transcript_path(scenario_dir), descriptor);

        // Setup
        if self.verbose {
            eprintln!("\nRunning scenario: {}", descriptor.name);
        }
        let setup_script = resolve_script(scenario_dir, SETUP_CANDIDATES);
        let setup = self.run_phase(
            Phase::Setup,
            &setup_script,
            Duration::from_secs(descriptor.timeout_seconds),
        );
        transcript.phase(Phase::Setup, &setup.combined_output);

        if !setup.succeeded {
            let mut result = ScenarioResult::new(descriptor, false, start.elapsed());
            result.error_message = Some(format!(
                "{SETUP_FAILED}: {}",
                truncate_output(&setup.combined_output, ERROR_OUTPUT_LIMIT)
            ));
            return self.finish(transcript, result, TranscriptStatus::Failed, Some(SETUP_FAILED));
        }

        // Validation
        let Some(validate_script) = find_script(scenario_dir, VALIDATE_CANDIDATES) else {
            let mut result = ScenarioResult::new(descriptor, true, start.elapsed());
            result.validation_output = NO_VALIDATION_SCRIPT.to_owned();
            return self.finish(transcript, result, TranscriptStatus::PassedUnvalidated, None);
        };

        if self.verbose {
            eprintln!("Validating scenario: {}", descriptor.name);
        }
        let validation = self.run_phase(Phase::Validation, &validate_script, self.validation_timeout);
        transcript.phase(Phase::Validation, &validation.combined_output);

        let mut result = ScenarioResult::new(descriptor, validation.succeeded, start.elapsed());
        result.validation_output = validation.combined_output;
        let status = if result.passed {
            TranscriptStatus::Passed
        } else {
            TranscriptStatus::Failed
        };
        self.finish(transcript, result, status, None)
    }

    fn run_phase(&self, phase: Phase, script: &Path, timeout: Duration) -> ExecutionOutcome {
        let span = info_span!("phase", phase = ?phase, script = %script.display());
        let _enter = span.enter();
        let outcome = self.executor.run(script, timeout);
        if self.verbose && !outcome.combined_output.is_empty() {
            eprintln!("{}", outcome.combined_output.trim_end_matches('\n'));
        }
        info!(
            succeeded = outcome.succeeded,
            timed_out = outcome.timed_out,
            elapsed_secs = outcome.elapsed_seconds,
            "phase finished"
        );
        outcome
    }

    /// The single terminal step: write the transcript, then hand back the result.
    fn finish(
        &self,
        transcript: Transcript,
        result: ScenarioResult,
        status: TranscriptStatus,
        error: Option<&str>,
    ) -> ScenarioResult {
        let path = transcript.path().to_owned();
        let duration = Duration::from_secs_f64(result.duration_seconds);
        if let Err(e) = transcript.finalize(status, duration, error) {
            warn!(path = %path.display(), error = %e, "failed to write transcript");
        }
        info!(
            passed = result.passed,
            duration_secs = result.duration_seconds,
            status = %status,
            "scenario finished"
        );
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
