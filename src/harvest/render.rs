//! Rendered-page text extraction (the HTML path).
//!
//! Pages are rendered through a [`PageRenderer`] (the production
//! implementation drives a shared browser session), then mined for readable
//! text: an error-marker scan first, then an ordered chain of content
//! container selectors, then the whole `<body>` as a last resort.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::error::HarvestFailure;
use super::fetcher::HttpFetcher;
use super::robots::RobotsPolicyCache;
use super::{ContentType, HarvestResult, normalize_whitespace, truncate_content};
use crate::config::HarvestConfig;

/// Content container selectors, tried in priority order. The first match
/// with enough text wins.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-content",
];

/// Tags whose text is never readable content.
const EXCLUDED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer"];

/// Markers that identify a rendered error page. Matched case-insensitively
/// against the page's visible text.
const ERROR_MARKERS: &[&str] = &["404", "not found", "page not found", "no content here", "missing"];

/// Failures raised by a page renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Navigation or DOM retrieval failed.
    #[error("{message}")]
    Navigation {
        /// What the browser reported.
        message: String,
    },

    /// The page did not finish loading within the configured timeout.
    #[error("page load timed out")]
    Timeout,
}

impl RenderError {
    /// Creates a navigation failure with a detail message.
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation {
            message: message.into(),
        }
    }
}

/// Renders a URL to its post-JavaScript HTML.
///
/// The production implementation wraps one browser session for the whole
/// run; `&mut self` makes the one-page-at-a-time discipline structural.
#[async_trait]
pub trait PageRenderer: Send {
    /// Navigates to `url` and returns the rendered document HTML.
    async fn render(&mut self, url: &str) -> Result<String, RenderError>;
}

/// Extracts readable text from rendered pages.
#[derive(Clone)]
pub struct RenderExtractor {
    fetcher: Arc<HttpFetcher>,
    robots: Arc<RobotsPolicyCache>,
    config: HarvestConfig,
}

impl RenderExtractor {
    /// Creates an extractor over the shared transport and robots cache.
    #[must_use]
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        robots: Arc<RobotsPolicyCache>,
        config: HarvestConfig,
    ) -> Self {
        Self {
            fetcher,
            robots,
            config,
        }
    }

    /// Harvests one page URL into a result row.
    ///
    /// Always returns a result; render faults are classified and never
    /// propagate, so the session stays usable for the next task.
    #[instrument(skip(self, renderer), fields(url = %url))]
    pub async fn extract(
        &self,
        renderer: &mut dyn PageRenderer,
        url: &str,
        title: &str,
    ) -> HarvestResult {
        match self.try_extract(renderer, url).await {
            Ok(content) => {
                debug!(chars = content.chars().count(), "page extracted");
                HarvestResult::accessible(title, ContentType::Html, content)
            }
            Err(failure) => {
                warn!(%failure, "page harvest failed");
                HarvestResult::inaccessible(title, ContentType::Html, &failure)
            }
        }
    }

    async fn try_extract(
        &self,
        renderer: &mut dyn PageRenderer,
        url: &str,
    ) -> Result<String, HarvestFailure> {
        if !self.robots.is_allowed(url, &self.fetcher).await {
            return Err(HarvestFailure::PolicyBlocked);
        }

        let html = renderer
            .render(url)
            .await
            .map_err(|e| HarvestFailure::fault(e.to_string()))?;

        let text = extract_page_text(&html, self.config.min_content_chars)?;
        Ok(truncate_content(&text, self.config.max_content_chars))
    }
}

/// Mines readable text out of a rendered document.
///
/// Order matters: the error-marker scan runs on the whole visible text
/// before any container is considered, so an error page styled inside
/// `<main>` is still rejected as not-found.
pub(crate) fn extract_page_text(html: &str, min_chars: usize) -> Result<String, HarvestFailure> {
    let document = Html::parse_document(html);

    let body_selector = parse_selector("body")?;
    let body_text = document
        .select(&body_selector)
        .next()
        .map(|body| element_text(&body))
        .unwrap_or_default();

    let lowered = body_text.to_lowercase();
    if ERROR_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return Err(HarvestFailure::NotFound);
    }

    for selector_str in CONTENT_SELECTORS {
        let selector = parse_selector(selector_str)?;
        if let Some(element) = document.select(&selector).next() {
            let text = element_text(&element);
            if text.chars().count() >= min_chars {
                debug!(selector = selector_str, "content container matched");
                return Ok(text);
            }
        }
    }

    // No container carried enough text; fall back to the whole body.
    if body_text.is_empty() {
        return Err(HarvestFailure::empty("no content found"));
    }
    if body_text.chars().count() < min_chars {
        return Err(HarvestFailure::empty("insufficient content found"));
    }
    Ok(body_text)
}

fn parse_selector(selector: &str) -> Result<Selector, HarvestFailure> {
    Selector::parse(selector)
        .map_err(|e| HarvestFailure::fault(format!("invalid selector {selector}: {e}")))
}

/// Collects an element's visible text, skipping text inside excluded tags.
fn element_text(element: &ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| EXCLUDED_TAGS.contains(&el.name()))
        });
        if !excluded {
            parts.push(text.to_string());
        }
    }
    normalize_whitespace(&parts.join(" "))
}
