//! Rate-limited HTTP transport shared by the document path and the robots
//! policy cache.
//!
//! Every outbound request acquires a slot from the global [`RateLimiter`]
//! before hitting the network, so the request-rate ceiling holds no matter
//! how many harvest tasks run concurrently.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use super::error::{HarvestFailure, HarvestRunError, classify_transport_error};
use super::rate_limiter::RateLimiter;
use crate::config::HarvestConfig;
use crate::user_agent::HARVEST_USER_AGENT;

/// A fully-buffered HTTP response: status, declared content type, and body.
#[derive(Debug)]
pub struct FetchedResponse {
    /// HTTP status code.
    pub status: u16,
    /// The `Content-Type` header value, when present and valid UTF-8.
    pub content_type: Option<String>,
    /// The complete response body.
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client wrapper that gates every request through the rate limiter.
///
/// Created once per run and shared (via `Arc`) so all fetches reuse the
/// same connection pool and the same rate window.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpFetcher {
    /// Creates the shared transport with browser identity and bounded
    /// timeouts from the config.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestRunError::HttpClient`] when the client builder
    /// rejects the configuration; the run cannot start without a transport.
    #[instrument(skip_all)]
    pub fn new(
        config: &HarvestConfig,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, HarvestRunError> {
        let client = Client::builder()
            .user_agent(HARVEST_USER_AGENT)
            .gzip(true)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(HarvestRunError::HttpClient)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Fetches `url` with a GET request, buffering the whole body.
    ///
    /// Acquires a rate-limiter slot first; the caller may therefore be
    /// suspended until the next window. Non-200 statuses are returned as
    /// data, not errors, so callers apply their own status policy.
    ///
    /// # Errors
    ///
    /// Returns a classified [`HarvestFailure::Transport`] when the request
    /// or body read fails at the network level.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<FetchedResponse, HarvestFailure> {
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, &e))?
            .to_vec();

        debug!(status, bytes = body.len(), "fetch complete");
        Ok(FetchedResponse {
            status,
            content_type,
            body,
        })
    }

    /// Returns the shared rate limiter, for callers that coordinate
    /// additional traffic against the same window.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }
}
