//! Headless hexwar battle runner.
//!
//! Plays scenarios without a front end and prints JSON reports.
//! Designed for scenario authoring checks and CI.
//!
//! # Usage
//!
//! ```bash
//! # Play a scenario to completion
//! cargo run -p hexwar_headless -- run --scenario scenarios/skirmish.ron
//!
//! # Validate a scenario file
//! cargo run -p hexwar_headless -- validate scenarios/skirmish.ron
//!
//! # Replay a scenario several times and compare state hashes
//! cargo run -p hexwar_headless -- verify --scenario scenarios/skirmish.ron --runs 5
//! ```
//!
//! Output (stdout): one JSON document.
//! Logs (stderr): filtered by `RUST_LOG`, `--verbose` raises the default to debug.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hexwar_headless::{
    runner::{run, RunConfig},
    scenario::{load, validate, ScenarioError},
};

#[derive(Parser)]
#[command(name = "hexwar_headless")]
#[command(about = "Headless hexwar battle runner for scenario checks and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy and auto-play a scenario, printing the battle report
    Run {
        /// Scenario RON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Stop after this many player turns
        #[arg(short, long)]
        turns: Option<u32>,
    },

    /// Parse a scenario and check that it can be deployed
    Validate {
        /// Scenario RON file
        file: PathBuf,
    },

    /// Play a scenario several times and check the final state hashes match
    Verify {
        /// Scenario RON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,

        /// Stop each run after this many player turns
        #[arg(short, long)]
        turns: Option<u32>,
    },
}

#[derive(Serialize)]
struct VerifyReport {
    scenario: String,
    runs: u32,
    hashes: Vec<u64>,
    deterministic: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for the report.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run { scenario, turns } => cmd_run(&scenario, turns, cli.pretty),
        Commands::Validate { file } => cmd_validate(&file, cli.pretty),
        Commands::Verify {
            scenario,
            runs,
            turns,
        } => cmd_verify(&scenario, runs, turns, cli.pretty),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), ScenarioError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{json}");
    Ok(())
}

/// Play one scenario and print its report.
fn cmd_run(path: &Path, turns: Option<u32>, pretty: bool) -> Result<bool, ScenarioError> {
    tracing::info!(path = %path.display(), "Running scenario");
    let scenario = load(path)?;
    let report = run(&scenario, &RunConfig { max_turns: turns })?;
    print_json(&report, pretty)?;
    Ok(true)
}

/// Validate a scenario without playing it.
fn cmd_validate(path: &Path, pretty: bool) -> Result<bool, ScenarioError> {
    let scenario = load(path)?;
    let summary = validate(&scenario)?;
    print_json(&summary, pretty)?;
    Ok(true)
}

/// Run a scenario repeatedly and compare final hashes.
fn cmd_verify(
    path: &Path,
    runs: u32,
    turns: Option<u32>,
    pretty: bool,
) -> Result<bool, ScenarioError> {
    tracing::info!(path = %path.display(), runs, "Verifying determinism");
    let scenario = load(path)?;
    let config = RunConfig { max_turns: turns };

    let mut hashes = Vec::with_capacity(runs as usize);
    for _ in 0..runs.max(1) {
        hashes.push(run(&scenario, &config)?.state_hash);
    }
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if deterministic {
        tracing::info!(hash = hashes[0], "All runs match");
    } else {
        tracing::error!(?hashes, "Runs diverged");
    }

    print_json(
        &VerifyReport {
            scenario: scenario.name,
            runs: runs.max(1),
            hashes,
            deterministic,
        },
        pretty,
    )?;
    Ok(deterministic)
}
