//! Process executor for scenario scripts.
//!
//! Runs one script through its interpreter with a timeout, capturing stdout
//! and stderr separately and concatenated. Every failure mode (missing
//! script, spawn error, non-zero exit, timeout) comes back as an
//! [`ExecutionOutcome`] with `succeeded == false`; [`ScriptExecutor::run`]
//! never returns an error.
//!
//! # Timeouts
//!
//! On Unix the script is started in its own process group. When the timeout
//! expires the whole group is killed, so helpers the script spawned do not
//! outlive it. Output readers are drained with a short grace period after the
//! child is reaped; a grandchild that escaped the group and still holds a pipe
//! open cannot stall the harness.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::HarnessConfig;

/// How often the child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep draining pipes after the child has been reaped.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Result of running one script. Never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutcome {
    /// True iff the script exited with code zero.
    pub succeeded: bool,
    /// Captured stdout followed by captured stderr.
    pub combined_output: String,
    /// Wall-clock time from spawn (or lookup) to reap.
    pub elapsed_seconds: f64,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr, plus the harness's own failure message if any.
    pub stderr: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// True if the script was killed for exceeding its timeout.
    pub timed_out: bool,
}

impl ExecutionOutcome {
    /// A failure that happened before (or instead of) running the script.
    fn not_run(message: String, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            combined_output: message.clone(),
            elapsed_seconds: elapsed.as_secs_f64(),
            stdout: String::new(),
            stderr: message,
            exit_code: None,
            timed_out: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Interpreter dispatch
// ---------------------------------------------------------------------------

/// Script families the executor knows how to launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    /// `.py` scripts, launched through the Python interpreter command.
    Python,
    /// Everything else, launched through the shell interpreter command.
    Shell,
}

impl ScriptKind {
    /// Pick the family from the script's extension.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Self::Python,
            _ => Self::Shell,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptExecutor
// ---------------------------------------------------------------------------

/// Launches scenario scripts with the configured interpreters and
/// environment overrides.
#[derive(Clone, Debug)]
pub struct ScriptExecutor {
    python: Vec<String>,
    shell: Vec<String>,
    env: BTreeMap<String, String>,
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new(&HarnessConfig::default())
    }
}

impl ScriptExecutor {
    /// Build an executor from the harness configuration.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            python: config.runner.python.clone(),
            shell: config.runner.shell.clone(),
            env: config.env.clone(),
        }
    }

    /// The full argv used to run `script`: interpreter prefix, then the path.
    #[must_use]
    pub fn command_line(&self, script: &Path) -> Vec<OsString> {
        let prefix = match ScriptKind::for_path(script) {
            ScriptKind::Python => &self.python,
            ScriptKind::Shell => &self.shell,
        };
        prefix
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(script.as_os_str().to_owned()))
            .collect()
    }

    /// Run `script` from its own directory, killing it after `timeout`.
    #[must_use]
    pub fn run(&self, script: &Path, timeout: Duration) -> ExecutionOutcome {
        let start = Instant::now();

        if !script.is_file() {
            return ExecutionOutcome::not_run(
                format!("Script not found: {}", script.display()),
                start.elapsed(),
            );
        }

        let argv = self.command_line(script);
        let Some((program, args)) = argv.split_first() else {
            return ExecutionOutcome::not_run(
                "Error running script: no interpreter configured".to_owned(),
                start.elapsed(),
            );
        };
        let working_dir = script.parent().unwrap_or_else(|| Path::new("."));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(traceparent) = crate::telemetry::current_traceparent() {
            cmd.env("TRACEPARENT", traceparent);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }

        debug!(script = %script.display(), ?argv, timeout_secs = timeout.as_secs_f64(), "spawning script");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(script = %script.display(), error = %e, "failed to spawn script");
                return ExecutionOutcome::not_run(
                    format!("Error running script: {e}"),
                    start.elapsed(),
                );
            }
        };

        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());

        let mut wait_error = None;
        let mut timed_out = false;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        warn!(script = %script.display(), "script timed out; killing process group");
                        timed_out = true;
                        terminate(&mut child);
                        break child.wait().ok();
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    wait_error = Some(e);
                    terminate(&mut child);
                    break child.wait().ok();
                }
            }
        };

        let elapsed = start.elapsed();
        let deadline = Instant::now() + OUTPUT_GRACE;
        let stdout = drain(stdout_rx, deadline);
        let mut stderr = drain(stderr_rx, deadline);

        let harness_message = if timed_out {
            Some(format!("Timeout after {} seconds", display_secs(timeout)))
        } else {
            wait_error.map(|e| format!("Error running script: {e}"))
        };
        if let Some(message) = harness_message {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&message);
        }

        let exit_code = status.and_then(|s| s.code());
        let succeeded = !timed_out && status.is_some_and(|s| s.success());
        debug!(
            script = %script.display(),
            ?exit_code,
            timed_out,
            elapsed_secs = elapsed.as_secs_f64(),
            "script finished"
        );

        ExecutionOutcome {
            succeeded,
            combined_output: format!("{stdout}{stderr}"),
            elapsed_seconds: elapsed.as_secs_f64(),
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    }
}

/// Kill the child and, on Unix, every process in its group.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        // The child leads its own group (process_group(0)), so -pid is the group.
        let _ = Command::new("kill")
            .args(["-KILL", &format!("-{}", child.id())])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
}

fn spawn_reader<R: Read + Send + 'static>(reader: Option<R>) -> Option<Receiver<Vec<u8>>> {
    let mut reader = reader?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0_u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    Some(rx)
}

/// Collect everything a reader produced until it closes or `deadline` passes.
fn drain(rx: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn display_secs(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{:.1}", d.as_secs_f64())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
