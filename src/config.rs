//! Runtime configuration for a harvest run.
//!
//! Every tunable has a serde default, so a config file only needs to name
//! the values it overrides and `HarvestConfig::default()` matches an empty
//! file.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a harvest run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Requests admitted per rate window, shared across the whole run.
    pub rate_limit: u32,
    /// Rate window length in milliseconds.
    pub rate_window_ms: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (connect + response body).
    pub request_timeout_secs: u64,
    /// How long to wait for a rendered page to reach `document.readyState`
    /// completion, in seconds.
    pub page_load_timeout_secs: u64,
    /// Pause after load before reading the DOM, in milliseconds, so late
    /// scripts can populate content containers.
    pub settle_delay_ms: u64,
    /// Maximum characters of extracted text kept per result.
    pub max_content_chars: usize,
    /// Minimum characters for a selector match on the render path to count
    /// as real content.
    pub min_content_chars: usize,
    /// Minimum byte size for a fetched document body to be plausible.
    pub min_document_bytes: usize,
    /// Maximum number of domains whose robots.txt policy is kept cached.
    pub robots_cache_capacity: usize,
    /// Whether the browser runs headless.
    pub headless: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            rate_limit: 2,
            rate_window_ms: 1_000,
            connect_timeout_secs: 30,
            request_timeout_secs: 60,
            page_load_timeout_secs: 30,
            settle_delay_ms: 500,
            max_content_chars: 5_000,
            min_content_chars: 150,
            min_document_bytes: 500,
            robots_cache_capacity: 100,
            headless: true,
        }
    }
}

impl HarvestConfig {
    /// Rate window length as a `Duration`.
    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    /// TCP connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Whole-request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Page-load timeout as a `Duration`.
    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    /// Post-load settle delay as a `Duration`.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
