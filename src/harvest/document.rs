//! Direct document fetching and text extraction (the PDF path).
//!
//! PDFs are fetched whole through the rate-limited transport, validated
//! before parsing (status, magic bytes, declared content type, plausible
//! size), and parsed for text off the async runtime. Every failure is
//! classified into an inaccessible result; nothing on this path can abort
//! a batch.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::error::HarvestFailure;
use super::fetcher::{FetchedResponse, HttpFetcher};
use super::robots::RobotsPolicyCache;
use super::{ContentType, HarvestResult, truncate_content};
use crate::config::HarvestConfig;

/// Leading bytes every real PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Fetches and extracts text from binary documents.
#[derive(Clone)]
pub struct DocumentFetcher {
    fetcher: Arc<HttpFetcher>,
    robots: Arc<RobotsPolicyCache>,
    config: HarvestConfig,
}

impl DocumentFetcher {
    /// Creates a document fetcher over the shared transport and robots cache.
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

    /// Harvests one document URL into a result row.
    ///
    /// Always returns a result; failures become inaccessible rows with a
    /// classified reason.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str, title: &str) -> HarvestResult {
        match self.try_fetch(url).await {
            Ok(content) => {
                debug!(chars = content.chars().count(), "document extracted");
                HarvestResult::accessible(title, ContentType::Pdf, content)
            }
            Err(failure) => {
                warn!(%failure, "document harvest failed");
                HarvestResult::inaccessible(title, ContentType::Pdf, &failure)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, HarvestFailure> {
        if !self.robots.is_allowed(url, &self.fetcher).await {
            return Err(HarvestFailure::PolicyBlocked);
        }

        let response = self.fetcher.get(url).await?;
        if response.status != 200 {
            return Err(HarvestFailure::http_status(response.status));
        }
        validate_pdf_response(&response, self.config.min_document_bytes)?;

        let text = extract_pdf_text(response.body).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(HarvestFailure::empty("no text content extracted"));
        }
        Ok(truncate_content(trimmed, self.config.max_content_chars))
    }
}

/// Validates a fetched body before handing it to the PDF parser.
///
/// The magic check runs first: a body that does not start with `%PDF-` is
/// rejected even when the declared content type claims to be a PDF.
fn validate_pdf_response(
    response: &FetchedResponse,
    min_bytes: usize,
) -> Result<(), HarvestFailure> {
    if !response.body.starts_with(PDF_MAGIC) {
        return Err(HarvestFailure::validation(
            "response body is not a PDF document",
        ));
    }

    if let Some(content_type) = &response.content_type {
        let lowered = content_type.to_ascii_lowercase();
        if !lowered.contains("pdf") && !lowered.contains("octet-stream") {
            return Err(HarvestFailure::validation(format!(
                "unexpected content type for document: {content_type}"
            )));
        }
    }

    if response.body.len() < min_bytes {
        return Err(HarvestFailure::validation(format!(
            "document too small to be a real PDF ({} bytes)",
            response.body.len()
        )));
    }

    Ok(())
}

/// Runs PDF text extraction on a blocking thread.
///
/// The parser is CPU-bound and can panic on malformed input; both parse
/// errors and panics come back as classified faults.
async fn extract_pdf_text(body: Vec<u8>) -> Result<String, HarvestFailure> {
    let extracted =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&body))
            .await
            .map_err(|_| HarvestFailure::fault("PDF parsing aborted"))?;
    extracted.map_err(|e| HarvestFailure::fault(format!("PDF parsing failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::harvest::rate_limiter::RateLimiter;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn doc_fetcher() -> DocumentFetcher {
        let config = HarvestConfig::default();
        let fetcher = Arc::new(
            HttpFetcher::new(&config, Arc::new(RateLimiter::disabled())).unwrap(),
        );
        let robots = Arc::new(RobotsPolicyCache::new(config.robots_cache_capacity));
        DocumentFetcher::new(fetcher, robots, config)
    }

    fn pdf_response(content_type: Option<&str>, body: &[u8]) -> FetchedResponse {
        FetchedResponse {
            status: 200,
            content_type: content_type.map(ToString::to_string),
            body: body.to_vec(),
        }
    }

    fn plausible_pdf_bytes() -> Vec<u8> {
        let mut body = b"%PDF-1.4\n".to_vec();
        body.resize(600, b' ');
        body
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_accepts_pdf_content_type() {
        let response = pdf_response(Some("application/pdf"), &plausible_pdf_bytes());
        assert!(validate_pdf_response(&response, 500).is_ok());
    }

    #[test]
    fn test_validate_accepts_octet_stream() {
        let response = pdf_response(Some("application/octet-stream"), &plausible_pdf_bytes());
        assert!(validate_pdf_response(&response, 500).is_ok());
    }

    #[test]
    fn test_validate_accepts_missing_content_type() {
        let response = pdf_response(None, &plausible_pdf_bytes());
        assert!(validate_pdf_response(&response, 500).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_magic_even_with_pdf_header() {
        let mut body = b"<html>not a pdf</html>".to_vec();
        body.resize(600, b' ');
        let response = pdf_response(Some("application/pdf"), &body);
        match validate_pdf_response(&response, 500) {
            Err(HarvestFailure::ContentValidation { detail }) => {
                assert!(detail.contains("not a PDF"), "{detail}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_html_content_type() {
        let response = pdf_response(Some("text/html"), &plausible_pdf_bytes());
        assert!(matches!(
            validate_pdf_response(&response, 500),
            Err(HarvestFailure::ContentValidation { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_undersized_body() {
        let response = pdf_response(Some("application/pdf"), b"%PDF-1.4 tiny");
        match validate_pdf_response(&response, 500) {
            Err(HarvestFailure::ContentValidation { detail }) => {
                assert!(detail.contains("too small"), "{detail}");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_is_deterministic() {
        let response = pdf_response(Some("application/pdf"), &plausible_pdf_bytes());
        let first = validate_pdf_response(&response, 500).is_ok();
        let second = validate_pdf_response(&response, 500).is_ok();
        assert_eq!(first, second);
    }

    // ==================== Fetch path Tests ====================

    #[tokio::test]
    async fn test_fetch_http_error_maps_to_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.pdf"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = doc_fetcher()
            .fetch(&format!("{}/gone.pdf", server.uri()), "Gone")
            .await;
        assert!(!result.accessible);
        assert_eq!(result.reason.as_deref(), Some("HTTP status 500"));
        assert_eq!(result.content_type, ContentType::Pdf);
    }

    #[tokio::test]
    async fn test_fetch_blocked_by_robots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
            )
            .mount(&server)
            .await;

        let result = doc_fetcher()
            .fetch(&format!("{}/private/doc.pdf", server.uri()), "Private")
            .await;
        assert!(!result.accessible);
        assert_eq!(result.reason.as_deref(), Some("blocked by robots.txt"));
    }

    #[tokio::test]
    async fn test_fetch_html_masquerading_as_pdf_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut body = b"<html><body>login page</body></html>".to_vec();
        body.resize(600, b' ');
        Mock::given(method("GET"))
            .and(path("/fake.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/pdf")
                    .set_body_bytes(body),
            )
            .mount(&server)
            .await;

        let result = doc_fetcher()
            .fetch(&format!("{}/fake.pdf", server.uri()), "Fake")
            .await;
        assert!(!result.accessible);
        assert_eq!(
            result.reason.as_deref(),
            Some("response body is not a PDF document")
        );
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_reason() {
        let result = doc_fetcher().fetch("http://127.0.0.1:1/doc.pdf", "Dead").await;
        assert!(!result.accessible);
        let reason = result.reason.unwrap();
        assert!(
            reason.contains("127.0.0.1:1"),
            "reason should name the URL: {reason}"
        );
    }
}
