// Copyright 2025 Benchgate Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for the benchmark regression gate.
//!
//! This crate provides the `benchgate` command-line interface: it loads
//! benchmark results and the stored baseline, runs the gate, writes the
//! report, decision log and (for trusted runs) the ratcheted baseline, and
//! turns the verdict into an exit status.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod logging;

use anyhow::{bail, Context, Result};
use benchgate_adapters::{collect, source_for_path, SuiteLayout};
use benchgate_core::{evaluate, BaselineDocument, GateOutcome, RunResults, Verdict};
use benchgate_report::io::{
    append_step_summary, read_baseline_or_default, write_baseline, write_decision_log, write_markdown,
};
use benchgate_report::{render_report, render_results_summary, DecisionLog};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use crate::config::Settings;

/// Exit status for a passing gate.
pub const EXIT_PASS: u8 = 0;
/// Exit status for a failing gate.
pub const EXIT_FAIL: u8 = 1;
/// Exit status for operational errors.
pub const EXIT_ERROR: u8 = 2;

/// Benchmark regression gate CLI.
#[derive(Parser, Debug)]
#[command(name = "benchgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML by extension).
    #[arg(short, long, global = true, env = "BENCHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Gate a run against the stored baseline.
    ///
    /// Exits 0 on pass, 1 on fail and 2 when the gate could not run.
    Check(CheckArgs),

    /// Print a table of every benchmark result, without gating.
    Summary {
        /// Result files or directories.
        #[arg(short, long = "results", required = true, num_args = 1..)]
        results: Vec<PathBuf>,

        /// Run identifier for records that carry none.
        #[arg(long, env = "BENCHGATE_RUN_ID", default_value = "local")]
        run_id: String,

        /// Also append the summary to this file.
        #[arg(long, env = "GITHUB_STEP_SUMMARY")]
        step_summary: Option<PathBuf>,
    },

    /// Build a fresh baseline from a run.
    Seed {
        /// Result files or directories.
        #[arg(short, long = "results", required = true, num_args = 1..)]
        results: Vec<PathBuf>,

        /// Where to write the baseline.
        #[arg(short, long)]
        output: PathBuf,

        /// Run identifier for records that carry none.
        #[arg(long, env = "BENCHGATE_RUN_ID", default_value = "local")]
        run_id: String,
    },

    /// Print the effective configuration as TOML.
    ShowConfig,
}

/// Arguments of `check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Result files or directories.
    #[arg(short, long = "results", required = true, num_args = 1..)]
    pub results: Vec<PathBuf>,

    /// Stored baseline. Missing means empty.
    #[arg(short, long, env = "BENCHGATE_BASELINE")]
    pub baseline: Option<PathBuf>,

    /// Treat the run as authoritative (e.g. nightly on the main branch).
    #[arg(long, env = "BENCHGATE_TRUSTED")]
    pub trusted: bool,

    /// Run identifier for records that carry none.
    #[arg(long, env = "BENCHGATE_RUN_ID", default_value = "local")]
    pub run_id: String,

    /// Where to write the ratcheted baseline. Defaults to `--baseline`.
    #[arg(long)]
    pub output_baseline: Option<PathBuf>,

    /// Write the markdown report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the JSON decision log to this file.
    #[arg(long)]
    pub decision_log: Option<PathBuf>,

    /// Append the markdown report to this file.
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    pub step_summary: Option<PathBuf>,

    /// Always exit 0 unless the gate could not run.
    #[arg(long)]
    pub no_fail: bool,
}

/// Parse arguments, set up logging and run.
pub fn run() -> Result<u8> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.log, cli.verbose)?;
    execute(cli.command, &settings)
}

/// Run a command with loaded settings.
pub fn execute(command: Commands, settings: &Settings) -> Result<u8> {
    match command {
        Commands::Check(args) => check(&args, settings),
        Commands::Summary {
            results,
            run_id,
            step_summary,
        } => {
            let run = load_results(&results, &run_id, &settings.ingest)?;
            let summary = render_results_summary(&run);
            print!("{}", summary);
            if let Some(path) = step_summary {
                append_step_summary(&summary, &path)
                    .with_context(|| format!("failed to append step summary {}", path.display()))?;
            }
            Ok(EXIT_PASS)
        }
        Commands::Seed {
            results,
            output,
            run_id,
        } => seed(&results, &output, &run_id, settings),
        Commands::ShowConfig => {
            print!("{}", settings.to_toml()?);
            Ok(EXIT_PASS)
        }
    }
}

fn load_results(paths: &[PathBuf], run_id: &str, layout: &SuiteLayout) -> Result<RunResults> {
    let sources: Vec<_> = paths.iter().map(|p| source_for_path(p, run_id, layout)).collect();
    collect(&sources).context("failed to load benchmark results")
}

fn check(args: &CheckArgs, settings: &Settings) -> Result<u8> {
    let baseline = match &args.baseline {
        Some(path) => read_baseline_or_default(path)
            .with_context(|| format!("failed to read baseline {}", path.display()))?,
        None => BaselineDocument::new(),
    };

    let run = load_results(&args.results, &args.run_id, &settings.ingest)?;
    let outcome = evaluate(&run, &baseline, args.trusted, &settings.gate_policy());

    let report = render_report(&outcome);
    print!("{}", report);

    if let Some(path) = &args.report {
        write_markdown(&report, path).with_context(|| format!("failed to write report {}", path.display()))?;
    }
    if let Some(path) = &args.decision_log {
        write_decision_log(&DecisionLog::from_outcome(&outcome), path)
            .with_context(|| format!("failed to write decision log {}", path.display()))?;
    }
    if let Some(path) = &args.step_summary {
        append_step_summary(&report, path)
            .with_context(|| format!("failed to append step summary {}", path.display()))?;
    }

    persist(&outcome, args.output_baseline.as_ref().or(args.baseline.as_ref()))?;
    print_banner(&outcome);

    Ok(match outcome.verdict {
        Verdict::Pass => EXIT_PASS,
        Verdict::Fail if args.no_fail => {
            warn!("Gate failed; exiting 0 because of --no-fail");
            EXIT_PASS
        }
        Verdict::Fail => EXIT_FAIL,
    })
}

fn persist(outcome: &GateOutcome, target: Option<&PathBuf>) -> Result<()> {
    match (outcome.persistable_baseline(), target) {
        (Some(next), Some(path)) => {
            write_baseline(&next.clone().stamped(Utc::now()), path)
                .with_context(|| format!("failed to write baseline {}", path.display()))?;
        }
        (Some(_), None) => warn!("Trusted run produced a baseline but no output path was given"),
        (None, _) if outcome.trusted => warn!("Baseline not persisted: the gate did not complete"),
        (None, _) => info!("Untrusted run; baseline left untouched"),
    }
    Ok(())
}

fn seed(results: &[PathBuf], output: &Path, run_id: &str, settings: &Settings) -> Result<u8> {
    let run = load_results(results, run_id, &settings.ingest)?;
    let outcome = evaluate(&run, &BaselineDocument::new(), true, &settings.gate_policy());
    if let Some(reason) = &outcome.failure {
        bail!("cannot seed baseline: {}", reason);
    }
    let Some(baseline) = outcome.persistable_baseline() else {
        bail!("cannot seed baseline: the gate produced no baseline");
    };
    if baseline.is_empty() {
        bail!("cannot seed baseline: no benchmark produced a usable result");
    }

    write_baseline(&baseline.clone().stamped(Utc::now()), output)
        .with_context(|| format!("failed to write baseline {}", output.display()))?;
    println!(
        "Seeded {} benchmark(s) into {} ({} unavailable)",
        baseline.len(),
        output.display(),
        outcome.unavailable.len()
    );
    Ok(EXIT_PASS)
}

fn print_banner(outcome: &GateOutcome) {
    let counts = outcome.counts();
    let detail = format!(
        "{} regression(s), {} improvement(s), {} neutral, {} new, {} unavailable",
        counts.regressions, counts.improvements, counts.neutral, counts.new, counts.unavailable
    );
    match (&outcome.verdict, &outcome.failure) {
        (Verdict::Pass, _) => eprintln!("{} {}", "PASS".green().bold(), detail),
        (Verdict::Fail, Some(reason)) => eprintln!("{} {}", "FAIL".red().bold(), reason),
        (Verdict::Fail, None) => eprintln!("{} {}", "FAIL".red().bold(), detail),
    }
}
