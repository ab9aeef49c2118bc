//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Harvest text content from lists of HTML pages and PDF documents.
///
/// Harvester takes a task list (`Name,URL[,Type]` rows or bare URLs),
/// fetches each target politely (robots.txt, global rate limit), extracts
/// readable text, and writes one result row per task.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Task list file; reads stdin when omitted
    pub input: Option<PathBuf>,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit newline-delimited JSON instead of CSV
    #[arg(long)]
    pub json: bool,

    /// Requests allowed per second across the whole run (0 to disable)
    #[arg(short = 'l', long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub rate_limit: u32,

    /// Whole-request timeout in seconds (1-600)
    #[arg(short = 't', long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Run the browser with a visible window
    #[arg(long)]
    pub no_headless: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
