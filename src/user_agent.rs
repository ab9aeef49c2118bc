//! Browser identity headers sent with every fetch and navigation.
//!
//! Some hosts serve reduced or blocked responses to non-browser clients,
//! so both the HTTP transport and the rendered-page session present the
//! same desktop Chrome identity.

/// User-Agent presented by the HTTP client and the browser session.
pub const HARVEST_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Accept-Language sent alongside the user agent.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Referrer presented on page navigations.
pub const NAVIGATION_REFERRER: &str = "https://www.google.com/";
