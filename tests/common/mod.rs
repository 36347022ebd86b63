//! Shared test helpers for evals integration tests.
//!
//! All tests use temp directories as the scenarios root. Scripts are written
//! as `.sh` files and the root's `evals.toml` routes them through `sh`, so no
//! Python toolchain is needed.
#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Harness config used by every test scenarios root.
pub const TEST_CONFIG: &str = "[runner]\nshell = [\"sh\"]\n";

/// Create an empty scenarios root with a test `evals.toml`.
pub fn setup_scenarios() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(dir.path().join("evals.toml"), TEST_CONFIG).expect("failed to write evals.toml");
    dir
}

/// Write a scenario directory with a declaration and optional scripts.
pub fn write_scenario(
    root: &Path,
    name: &str,
    yaml: &str,
    setup: Option<&str>,
    validate: Option<&str>,
) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("scenario.yaml"), yaml).unwrap();
    if let Some(body) = setup {
        std::fs::write(dir.join("scenario.sh"), body).unwrap();
    }
    if let Some(body) = validate {
        std::fs::write(dir.join("validate.sh"), body).unwrap();
    }
}

/// Read the transcript left in a scenario directory.
pub fn read_transcript(root: &Path, name: &str) -> String {
    std::fs::read_to_string(root.join(name).join("latest-run.txt"))
        .unwrap_or_else(|e| panic!("no transcript for {name}: {e}"))
}

/// Run evals against the given scenarios root.
pub fn evals_in(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evals"))
        .args(args)
        .arg("--scenarios-dir")
        .arg(root)
        .current_dir(root)
        .env_remove("EVALS_SCENARIOS_DIR")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute evals")
}

/// Run evals and assert it succeeds. Returns stdout as string.
pub fn evals_ok(root: &Path, args: &[&str]) -> String {
    let out = evals_in(root, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "evals {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run evals and assert it exits 1. Returns (stdout, stderr).
pub fn evals_fails(root: &Path, args: &[&str]) -> (String, String) {
    let out = evals_in(root, args);
    assert_eq!(
        out.status.code(),
        Some(1),
        "Expected evals {} to exit 1.\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
    (
        String::from_utf8_lossy(&out.stdout).to_string(),
        String::from_utf8_lossy(&out.stderr).to_string(),
    )
}
