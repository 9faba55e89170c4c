// src/main.rs

mod cli;
mod error;
mod header;
mod history;
mod license;
mod model;
mod orchestrator;
mod processor;
mod report;
mod syntax;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use cli::Args;
use history::{GitHistory, HistoryProvider};
use orchestrator::Orchestrator;
use processor::ProcessorConfig;
use report::{ProgressReporter, RunSummary};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(if args.verbose { Level::DEBUG } else { Level::WARN });

    let start_time = Instant::now();
    match run(&args) {
        Ok(summary) => {
            println!("\n\nProcessing complete in {:.2?}!", start_time.elapsed());
            println!("{}", "=".repeat(50));
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<RunSummary> {
    println!("REUSE Header Updater");
    println!("{}", "=".repeat(50));

    let history = GitHistory::open(&args.repo)
        .with_context(|| format!("failed to open repository at {}", args.repo.display()))?;
    let files = history
        .list_tracked_files(&args.patterns)
        .context("failed to list tracked files")?;

    if files.is_empty() {
        println!("No files found to process");
    } else {
        println!("Found {} files to process", files.len());
    }

    let config = ProcessorConfig {
        root: history.workdir().to_path_buf(),
        licenses: args.licenses(),
        operator: args.operator().or_else(|| history.operator_identity()),
        current_year: chrono::Local::now().year(),
        dry_run: args.dry_run,
    };
    if config.dry_run {
        println!("Dry run: no files will be written");
    }

    let reporter = ProgressReporter::new(files.len() as u64, config.licenses.clone());
    let orchestrator = Orchestrator::new(Arc::new(history), config, args.cutoff.clone(), args.jobs);
    let summary = orchestrator.run(&files, &reporter)?;
    info!(phase = ?orchestrator.phase(), "run finished");
    Ok(summary)
}
