//! Concurrent content-harvesting engine.
//!
//! Given a list of named URLs with a declared or inferred content type, the
//! engine retrieves each resource while respecting per-domain crawl policy
//! (robots.txt) and a global request-rate ceiling, extracts normalized text
//! through one of two strategies (direct document parsing for PDFs,
//! rendered-DOM extraction for HTML), and produces exactly one
//! [`HarvestResult`] per input task.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::{HarvestConfig, HarvestTask, run_harvest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tasks = vec![HarvestTask::new(
//!     "Example report",
//!     "https://example.com/report.pdf",
//!     None,
//! )];
//! let results = run_harvest(&tasks, &HarvestConfig::default()).await?;
//! assert_eq!(results.len(), tasks.len());
//! # Ok(())
//! # }
//! ```

mod browser;
mod coordinator;
mod document;
mod error;
mod fetcher;
pub mod rate_limiter;
mod render;
mod robots;

pub use browser::BrowserSession;
pub use coordinator::{HarvestCoordinator, run_harvest};
pub use document::DocumentFetcher;
pub use error::{HarvestFailure, HarvestRunError, classify_transport_error};
pub use fetcher::{FetchedResponse, HttpFetcher};
pub use rate_limiter::RateLimiter;
pub use render::{PageRenderer, RenderError, RenderExtractor};
pub use robots::RobotsPolicyCache;

use serde::Serialize;
use url::Url;

/// Content type of a harvest target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    /// A web page extracted via the rendered-DOM path.
    Html,
    /// A binary document extracted via the direct-fetch path.
    Pdf,
    /// Anything the resolver cannot route; rejected without a fetch.
    Unknown,
}

impl ContentType {
    /// Resolves the effective content type for a task.
    ///
    /// A declared type is authoritative. Otherwise the type is inferred
    /// from the URL path: `.pdf` is a document, `.html`/`.htm` or a final
    /// segment without an extension is a page, everything else is unknown.
    #[must_use]
    pub fn resolve(task: &HarvestTask) -> ContentType {
        task.declared.unwrap_or_else(|| infer_from_url(&task.url))
    }

    /// The upper-case label used in serialized output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ContentType::Html => "HTML",
            ContentType::Pdf => "PDF",
            ContentType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn infer_from_url(url: &str) -> ContentType {
    let Ok(parsed) = Url::parse(url) else {
        return ContentType::Unknown;
    };
    let path = parsed.path().to_ascii_lowercase();
    if path.ends_with(".pdf") {
        ContentType::Pdf
    } else if path.ends_with(".html") || path.ends_with(".htm") {
        ContentType::Html
    } else {
        let last_segment = path.rsplit('/').next().unwrap_or("");
        if last_segment.contains('.') {
            ContentType::Unknown
        } else {
            ContentType::Html
        }
    }
}

/// One unit of harvesting work: a display name, a URL, and an optional
/// declared content type. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestTask {
    /// Display title carried through to the result.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Declared content type; `None` means "infer from the URL".
    pub declared: Option<ContentType>,
}

impl HarvestTask {
    /// Creates a new harvest task.
    pub fn new(name: impl Into<String>, url: impl Into<String>, declared: Option<ContentType>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            declared,
        }
    }
}

/// The normalized outcome of one harvest task.
///
/// Produced exactly once per input task; `content` is truncated to the
/// configured maximum length to bound downstream storage.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestResult {
    /// Display title (the task's name).
    pub title: String,
    /// Extracted text; empty when the task was inaccessible.
    pub content: String,
    /// Whether usable content was retrieved.
    pub accessible: bool,
    /// The resolved content type of the task.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Why the task was inaccessible, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HarvestResult {
    /// Creates an accessible result carrying extracted content.
    pub fn accessible(title: impl Into<String>, content_type: ContentType, content: String) -> Self {
        Self {
            title: title.into(),
            content,
            accessible: true,
            content_type,
            reason: None,
        }
    }

    /// Creates an inaccessible result from a classified failure.
    pub fn inaccessible(
        title: impl Into<String>,
        content_type: ContentType,
        failure: &HarvestFailure,
    ) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            accessible: false,
            content_type,
            reason: Some(failure.to_string()),
        }
    }
}

/// Truncates extracted text to at most `max_chars` characters.
pub(crate) fn truncate_content(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Collapses whitespace runs (including newlines) to single spaces.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
