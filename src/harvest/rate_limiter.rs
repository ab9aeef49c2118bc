//! Global fixed-window rate limiting for outbound requests.
//!
//! This module provides the [`RateLimiter`] struct which caps the number of
//! outbound requests admitted per fixed time window across the *entire*
//! run, not per domain. It gates every document and robots.txt fetch;
//! render-path navigation is not gated because the single browser session
//! already serializes it.
//!
//! # Overview
//!
//! A window admits at most `limit` requests. When the window is full,
//! callers suspend until the window boundary (`window_start + period`)
//! passes, then the counter resets and the waiting caller re-contends for
//! a slot. Admission is checked and recorded under one lock, so two tasks
//! racing for the last slot can never both be admitted in the same window.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use harvester_core::harvest::RateLimiter;
//!
//! # async fn example() {
//! // At most 2 requests per second, shared by all concurrent fetches.
//! let limiter = RateLimiter::new(2, Duration::from_secs(1));
//!
//! limiter.acquire().await; // immediate
//! limiter.acquire().await; // immediate, fills the window
//! limiter.acquire().await; // suspends until the next window
//! # }
//! ```

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Default number of requests admitted per window.
pub const DEFAULT_WINDOW_LIMIT: u32 = 2;

/// Default window period (one second).
pub const DEFAULT_WINDOW_PERIOD: Duration = Duration::from_secs(1);

/// Mutable window state, protected by a single async lock.
#[derive(Debug)]
struct RateWindow {
    /// When the current window opened.
    window_start: Instant,
    /// Requests admitted in the current window.
    count: u32,
}

/// Process-wide fixed-window rate limiter.
///
/// Designed to be wrapped in `Arc` and shared across spawned Tokio tasks.
/// All state lives behind a `tokio::sync::Mutex`; the lock is never held
/// across a sleep, so waiting callers do not block admission bookkeeping.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests admitted per window.
    limit: u32,
    /// Window length.
    period: Duration,
    /// Whether rate limiting is disabled (limit 0 from the CLI).
    disabled: bool,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    /// Creates a rate limiter admitting `limit` requests per `period`.
    #[must_use]
    #[instrument(skip_all, fields(limit = limit, period_ms = period.as_millis()))]
    pub fn new(limit: u32, period: Duration) -> Self {
        debug!("creating fixed-window rate limiter");
        Self {
            limit: limit.max(1),
            period,
            disabled: false,
            window: Mutex::new(RateWindow {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Creates a disabled rate limiter that admits every caller immediately.
    #[must_use]
    #[instrument]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self {
            limit: u32::MAX,
            period: Duration::ZERO,
            disabled: true,
            window: Mutex::new(RateWindow {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the per-window admission limit.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the window period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Suspends the caller until a slot is available in the current window.
    ///
    /// The first `limit` callers in a window proceed immediately; later
    /// callers sleep until the window boundary and then re-contend. No
    /// window ever admits more than `limit` requests.
    #[instrument(level = "debug", skip(self))]
    pub async fn acquire(&self) {
        if self.disabled {
            return;
        }

        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                if now.duration_since(window.window_start) >= self.period {
                    window.window_start = now;
                    window.count = 0;
                }
                if window.count < self.limit {
                    window.count += 1;
                    return;
                }
                // Window full: wait out the remainder, then re-contend.
                self.period
                    .saturating_sub(now.duration_since(window.window_start))
            };

            debug!(wait_ms = wait.as_millis(), "rate window full, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Snapshot of the current window for tests and diagnostics:
    /// (elapsed time in the window, admitted count).
    pub async fn window_snapshot(&self) -> (Duration, u32) {
        let window = self.window.lock().await;
        (window.window_start.elapsed(), window.count)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LIMIT, DEFAULT_WINDOW_PERIOD)
    }
}
