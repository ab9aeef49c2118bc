//! CLI entry point for the harvester tool.

use std::fs;
use std::io::{self, IsTerminal, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    HarvestConfig, parse_task_list, run_harvest, write_results_csv, write_results_json,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Harvester starting");

    // Read input: from the task-list file or stdin
    let input_text = if let Some(path) = &args.input {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read task list {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pass a task-list file or pipe tasks via stdin.");
        info!("Example: echo 'https://example.com/report.pdf' | harvester");
        return Ok(());
    };

    let parse_result = parse_task_list(&input_text);
    for skipped in &parse_result.skipped {
        warn!(line = %skipped, "Skipped unrecognized input line");
    }
    if parse_result.is_empty() {
        info!("No valid tasks found in input");
        return Ok(());
    }
    info!(
        tasks = parse_result.len(),
        skipped = parse_result.skipped.len(),
        "Parsed task list"
    );

    let config = HarvestConfig {
        rate_limit: args.rate_limit,
        request_timeout_secs: args.timeout,
        headless: !args.no_headless,
        ..HarvestConfig::default()
    };

    let results = run_harvest(&parse_result.tasks, &config).await?;

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            fs::File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    if args.json {
        write_results_json(&mut output, &results)?;
    } else {
        write_results_csv(&mut output, &results)?;
    }

    let accessible = results.iter().filter(|r| r.accessible).count();
    info!(
        total = results.len(),
        accessible,
        inaccessible = results.len() - accessible,
        "Harvest complete"
    );

    Ok(())
}
