//! Error types for the harvest module.
//!
//! Failures are split in two: [`HarvestFailure`] classifies a single task's
//! outcome and is always converted into an inaccessible [`HarvestResult`]
//! at the operation boundary, while [`HarvestRunError`] covers resource
//! acquisition at startup, which is fatal for the whole run.
//!
//! [`HarvestResult`]: super::HarvestResult

use thiserror::Error;

/// Classified failure for a single harvest task.
///
/// The `Display` output of each variant is the `reason` string recorded on
/// the task's result row, so the wording is part of the output contract.
#[derive(Debug, Error)]
pub enum HarvestFailure {
    /// robots.txt disallows the task's path; no fetch was attempted.
    #[error("blocked by robots.txt")]
    PolicyBlocked,

    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("{detail}")]
    Transport {
        /// Human-readable transport detail.
        detail: String,
    },

    /// The server answered with a non-200 status.
    #[error("HTTP status {status}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// The response body failed document validation.
    #[error("{detail}")]
    ContentValidation {
        /// What the validation check found.
        detail: String,
    },

    /// The parser/extractor produced no usable text.
    #[error("{detail}")]
    ExtractionEmpty {
        /// Which emptiness rule fired.
        detail: String,
    },

    /// The rendered page carries an error marker ("404", "not found", ...).
    #[error("page not found")]
    NotFound,

    /// Content-type resolution yielded UNKNOWN; no network call is made.
    #[error("unsupported file type")]
    UnsupportedType,

    /// Any other fault raised during fetch/extract, captured at the
    /// operation boundary.
    #[error("{message}")]
    Fault {
        /// The underlying fault message.
        message: String,
    },
}

impl HarvestFailure {
    /// Creates a transport failure with a detail string.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    /// Creates an HTTP status failure.
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus { status }
    }

    /// Creates a content validation failure.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::ContentValidation {
            detail: detail.into(),
        }
    }

    /// Creates an empty-extraction failure.
    pub fn empty(detail: impl Into<String>) -> Self {
        Self::ExtractionEmpty {
            detail: detail.into(),
        }
    }

    /// Creates an unexpected-fault failure.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}

/// Maps a reqwest error to a classified transport failure.
///
/// Timeouts and connection-phase errors get stable reason strings so the
/// output rows stay grep-able; everything else keeps the source message.
#[must_use]
pub fn classify_transport_error(url: &str, source: &reqwest::Error) -> HarvestFailure {
    if source.is_timeout() {
        HarvestFailure::transport(format!("request timed out fetching {url}"))
    } else if source.is_connect() {
        HarvestFailure::transport(format!("connection failed for {url}: {source}"))
    } else {
        HarvestFailure::transport(format!("network error fetching {url}: {source}"))
    }
}

/// Fatal errors that prevent a harvest run from starting.
///
/// Per-task failures never surface here; once the run's resources are
/// acquired, the coordinator always returns one result per task.
#[derive(Debug, Error)]
pub enum HarvestRunError {
    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The browser launch configuration was rejected.
    #[error("failed to configure browser: {0}")]
    BrowserConfig(String),

    /// The headless browser could not be launched.
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),
}
