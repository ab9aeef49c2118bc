//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which turns curated lists of web sources (HTML pages and PDF documents)
//! into normalized text, one result row per source.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`harvest`] - The harvesting engine: coordination, fetching,
//!   rendering, robots policy, and rate limiting
//! - [`parser`] - Task-list parsing (`Name,URL[,Type]` rows, bare URLs)
//! - [`output`] - Result serialization (CSV, JSON lines)
//! - [`config`] - Run configuration with sensible defaults

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod harvest;
pub mod output;
pub mod parser;
pub mod user_agent;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use harvest::{
    BrowserSession, ContentType, DocumentFetcher, HarvestCoordinator, HarvestFailure,
    HarvestResult, HarvestRunError, HarvestTask, PageRenderer, RateLimiter, RenderExtractor,
    RobotsPolicyCache, run_harvest,
};
pub use output::{write_results_csv, write_results_json};
pub use parser::{ParseResult, parse_task_list};
