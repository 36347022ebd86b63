mod common;
use common::*;

#[test]
fn unknown_scenario_lists_alternatives() {
    let root = setup_scenarios();
    write_scenario(root.path(), "alpha", "name: alpha\n", Some("true\n"), None);
    write_scenario(root.path(), "beta", "name: beta\n", Some("true\n"), None);

    let (stdout, stderr) = evals_fails(root.path(), &["gamma"]);
    assert!(stdout.is_empty(), "no report expected: {stdout}");
    assert!(stderr.contains("Error: Scenario 'gamma' not found"), "stderr: {stderr}");
    assert!(stderr.contains("Looking in: "));
    assert!(stderr.contains("Available scenarios:"));
    assert!(stderr.contains("  - alpha"));
    assert!(stderr.contains("  - beta"));
}

#[test]
fn directory_without_declaration_names_missing_file() {
    let root = setup_scenarios();
    std::fs::create_dir(root.path().join("draft")).unwrap();

    let (_, stderr) = evals_fails(root.path(), &["draft"]);
    assert!(stderr.contains("Error: 'draft' is not a valid scenario"), "stderr: {stderr}");
    assert!(stderr.contains("Missing: "));
    assert!(stderr.contains("scenario.yaml"));
}

#[test]
fn malformed_declaration_is_fatal() {
    let root = setup_scenarios();
    write_scenario(
        root.path(),
        "bad-yaml",
        "description: no name here\n",
        Some("touch ran\n"),
        None,
    );

    let (_, stderr) = evals_fails(root.path(), &["bad-yaml"]);
    assert!(stderr.starts_with("Error: "), "stderr: {stderr}");
    assert!(stderr.contains("scenario.yaml"));
    assert!(stderr.contains("name"));
    assert!(!root.path().join("bad-yaml/ran").exists(), "setup must not run");
    assert!(!root.path().join("bad-yaml/latest-run.txt").exists());
}

#[test]
fn unknown_declaration_keys_are_rejected() {
    let root = setup_scenarios();
    write_scenario(
        root.path(),
        "typo",
        "name: typo\ntimout: 10\n",
        Some("true\n"),
        None,
    );

    let (_, stderr) = evals_fails(root.path(), &["typo"]);
    assert!(stderr.contains("timout"), "stderr: {stderr}");
}

#[test]
fn invalid_harness_config_is_fatal() {
    let root = setup_scenarios();
    std::fs::write(root.path().join("evals.toml"), "[runner]\nshel = [\"sh\"]\n").unwrap();
    write_scenario(root.path(), "any", "name: any\n", Some("true\n"), None);

    let (_, stderr) = evals_fails(root.path(), &["any"]);
    assert!(stderr.contains("evals.toml"), "stderr: {stderr}");
    assert!(stderr.contains("line 2"));
}

#[test]
fn scenarios_dir_can_come_from_env() {
    let root = setup_scenarios();
    write_scenario(root.path(), "from-env", "name: from-env\n", Some("true\n"), None);

    let out = std::process::Command::new(env!("CARGO_BIN_EXE_evals"))
        .arg("from-env")
        .env("EVALS_SCENARIOS_DIR", root.path())
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .current_dir(std::env::temp_dir())
        .output()
        .expect("failed to execute evals");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn progress_line_goes_to_stderr() {
    let root = setup_scenarios();
    write_scenario(root.path(), "quiet", "name: quiet\n", Some("echo noisy\n"), None);

    let out = evals_in(root.path(), &["quiet"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stderr.contains("Running scenario: quiet"), "stderr: {stderr}");
    assert!(!stdout.contains("Running scenario"));
    assert!(!stdout.contains("noisy"), "script output is not echoed without --verbose");
}

#[test]
fn verbose_echoes_script_output_to_stderr() {
    let root = setup_scenarios();
    write_scenario(
        root.path(),
        "chatty",
        "name: chatty\n",
        Some("echo setting things up\n"),
        Some("echo checking things\n"),
    );

    let out = evals_in(root.path(), &["chatty", "--verbose", "--format", "json"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("setting things up"), "stderr: {stderr}");
    assert!(stderr.contains("checking things"));

    let parsed: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout stays pure JSON in verbose mode");
    assert_eq!(parsed[0]["passed"], true);
}

#[test]
fn unknown_format_is_a_usage_error() {
    let root = setup_scenarios();
    let out = evals_in(root.path(), &["anything", "--format", "yaml"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("yaml"));
}
