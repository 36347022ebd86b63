use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use evals::config::HarnessConfig;
use evals::descriptor::{DECLARATION_FILE, ScenarioDescriptor};
use evals::error::HarnessError;
use evals::format::OutputFormat;
use evals::locate::locate_scenario;
use evals::report;
use evals::runner::{ScenarioResult, ScenarioRunner};
use evals::telemetry;

/// Run an evaluation scenario and report whether it passed
///
/// A scenario is a directory under the scenarios root holding a
/// `scenario.yaml` declaration, a setup script (`scenario.py` or
/// `scenario.sh`) and optionally a validation script (`validate.py` or
/// `validate.sh`). Python scripts run through `uv run`, everything else
/// through `bash`; both can be changed in `<scenarios-dir>/evals.toml`.
///
/// Every run leaves a transcript in the scenario directory
/// (`latest-run.txt` by default).
///
/// EXIT STATUS:
///
///   0  every requested scenario passed
///   1  a scenario failed, or the harness could not run it
#[derive(Parser)]
#[command(name = "evals")]
#[command(version, about)]
struct Cli {
    /// Name of the scenario directory to run
    scenario: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Echo script output to stderr and log harness activity
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing the scenario directories
    #[arg(long, env = "EVALS_SCENARIOS_DIR", default_value = "scenarios")]
    scenarios_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.verbose);

    match run(&cli) {
        Ok(results) => ExitCode::from(report::exit_code(&results)),
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(harness) = err.downcast_ref::<HarnessError>() {
                for hint in harness.hints() {
                    eprintln!("{hint}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Vec<ScenarioResult>> {
    let config = HarnessConfig::load(&cli.scenarios_dir).map_err(HarnessError::from)?;
    let scenario_dir = locate_scenario(&cli.scenarios_dir, &cli.scenario)?;
    let descriptor =
        ScenarioDescriptor::load(&scenario_dir.join(DECLARATION_FILE)).map_err(HarnessError::from)?;

    let runner = ScenarioRunner::new(&config).verbose(cli.verbose);
    let results = vec![run_with_progress(&runner, &scenario_dir, &descriptor, cli.verbose)];

    let rendered = report::render(&results, cli.format, cli.format.should_use_color())
        .context("failed to render report")?;
    print!("{rendered}");
    Ok(results)
}

fn run_with_progress(
    runner: &ScenarioRunner,
    scenario_dir: &Path,
    descriptor: &ScenarioDescriptor,
    verbose: bool,
) -> ScenarioResult {
    // A verbose runner announces each phase itself.
    if verbose {
        return runner.run(scenario_dir, descriptor);
    }
    let message = format!("Running scenario: {}", descriptor.name);
    if !std::io::stderr().is_terminal() {
        eprintln!("{message}");
        return runner.run(scenario_dir, descriptor);
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.clone());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = runner.run(scenario_dir, descriptor);
    spinner.finish_and_clear();
    eprintln!("{message}");
    result
}
