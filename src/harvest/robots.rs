//! robots.txt policy fetching, parsing, and caching.
//!
//! Each domain's policy is fetched at most once per run (while cached) and
//! compiled into prefix rules from the `User-agent: *` group. Policy is
//! advisory and the engine fails open: any problem obtaining or reading
//! robots.txt allows the fetch, with a warning.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::SystemTime;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use super::fetcher::HttpFetcher;

/// One compiled rule from a `User-agent: *` group.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RobotRule {
    /// Normalized path prefix (leading `/`, trailing `*` stripped).
    prefix: String,
    /// `true` for `Allow`, `false` for `Disallow`.
    allow: bool,
}

/// Compiled policy for one domain.
#[derive(Debug)]
struct DomainPolicy {
    /// Rules sorted longest-prefix-first, `Allow` before `Disallow` on ties.
    rules: Vec<RobotRule>,
    /// When the policy was fetched; kept for diagnostics.
    #[allow(dead_code)]
    fetched_at: SystemTime,
}

impl DomainPolicy {
    fn allow_all() -> Self {
        Self {
            rules: Vec::new(),
            fetched_at: SystemTime::now(),
        }
    }

    fn from_body(body: &str) -> Self {
        Self {
            rules: parse_rules(body),
            fetched_at: SystemTime::now(),
        }
    }

    /// First (longest) matching prefix decides; no match allows.
    fn is_allowed(&self, path: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| path.starts_with(rule.prefix.as_str()))
            .is_none_or(|rule| rule.allow)
    }
}

/// Bounded per-domain robots.txt policy cache.
///
/// First contact with a domain is serialized per origin, so two tasks
/// landing on a new domain at the same time cannot both fetch its
/// robots.txt, while a slow first-contact fetch never blocks cached
/// lookups for other domains.
#[derive(Debug)]
pub struct RobotsPolicyCache {
    cache: Mutex<LruCache<String, DomainPolicy>>,
    /// Per-origin locks for policy fetches in flight.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RobotsPolicyCache {
    /// Creates a cache retaining policy for at most `capacity` domains,
    /// evicting the least recently used beyond that.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether `url` may be fetched under its domain's robots policy.
    ///
    /// Policy is keyed by `scheme://host[:port]`. On a cache miss the
    /// policy is fetched through `fetcher` (and therefore rate-limited).
    /// Unparseable URLs, fetch failures, and non-200 responses all allow.
    #[instrument(skip(self, fetcher), fields(url = %url))]
    pub async fn is_allowed(&self, url: &str, fetcher: &HttpFetcher) -> bool {
        let Some((origin, path)) = origin_and_path(url) else {
            return true;
        };

        if let Some(policy) = self.cache.lock().await.get(&origin) {
            return policy.is_allowed(&path);
        }

        // Serialize first contact per origin only; the cache lock is never
        // held across the network fetch, so cached lookups for other
        // domains proceed while a slow robots.txt fetch is in flight.
        let origin_lock = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(origin.clone()).or_default())
        };
        let guard = origin_lock.lock().await;

        // Another task may have populated the policy while we waited.
        if let Some(policy) = self.cache.lock().await.get(&origin) {
            return policy.is_allowed(&path);
        }

        let policy = fetch_policy(&origin, fetcher).await;
        let allowed = policy.is_allowed(&path);
        self.cache.lock().await.put(origin.clone(), policy);
        drop(guard);

        // Late arrivals hit the cache first, so a fresh lock entry for this
        // origin is harmless.
        self.in_flight.lock().await.remove(&origin);
        allowed
    }

    /// Number of domains currently cached.
    pub async fn cached_domains(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Fetches and compiles the policy for one origin; any failure allows all.
async fn fetch_policy(origin: &str, fetcher: &HttpFetcher) -> DomainPolicy {
    let robots_url = format!("{origin}/robots.txt");
    match fetcher.get(&robots_url).await {
        Ok(response) if response.status == 200 => {
            debug!(origin, "compiled robots.txt policy");
            DomainPolicy::from_body(&response.text())
        }
        Ok(response) => {
            debug!(origin, status = response.status, "no usable robots.txt, allowing all");
            DomainPolicy::allow_all()
        }
        Err(error) => {
            warn!(origin, %error, "robots.txt fetch failed, allowing all");
            DomainPolicy::allow_all()
        }
    }
}

fn origin_and_path(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let origin = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    };
    let path = if parsed.path().is_empty() {
        "/".to_string()
    } else {
        parsed.path().to_string()
    };
    Some((origin, path))
}

/// Parses `Allow`/`Disallow` rules from the `User-agent: *` groups.
///
/// Rules are sorted longest-prefix-first so the most specific rule decides,
/// with `Allow` winning over `Disallow` at equal length.
fn parse_rules(body: &str) -> Vec<RobotRule> {
    let mut in_star_group = false;
    let mut rules = Vec::new();

    for raw_line in body.lines() {
        // Strip inline comments before interpreting the line.
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        let value = value.trim();

        match field.as_str() {
            "user-agent" => in_star_group = value == "*",
            "allow" | "disallow" if in_star_group => {
                if let Some(prefix) = normalize_prefix(value) {
                    let rule = RobotRule {
                        prefix,
                        allow: field == "allow",
                    };
                    if !rules.contains(&rule) {
                        rules.push(rule);
                    }
                }
            }
            _ => {}
        }
    }

    rules.sort_by(|a, b| {
        b.prefix
            .len()
            .cmp(&a.prefix.len())
            .then_with(|| b.allow.cmp(&a.allow))
    });
    rules
}

/// Normalizes a rule path: leading `/` enforced, trailing `*` dropped.
/// Empty paths (meaning "allow all" in a Disallow line) produce no rule.
fn normalize_prefix(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_end_matches('*');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::HarvestConfig;
    use crate::harvest::rate_limiter::RateLimiter;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(
            &HarvestConfig::default(),
            Arc::new(RateLimiter::disabled()),
        )
        .unwrap()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_rules_empty_body() {
        assert!(parse_rules("").is_empty());
    }

    #[test]
    fn test_parse_rules_star_group_only() {
        let rules = parse_rules(
            "User-agent: Googlebot\nDisallow: /bots-only/\n\nUser-agent: *\nDisallow: /private/\n",
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].prefix, "/private/");
        assert!(!rules[0].allow);
    }

    #[test]
    fn test_parse_rules_allow_and_disallow() {
        let rules = parse_rules("User-agent: *\nDisallow: /docs/\nAllow: /docs/public/\n");
        // Longest prefix first, so the Allow rule decides for /docs/public/.
        assert_eq!(rules[0].prefix, "/docs/public/");
        assert!(rules[0].allow);
        assert_eq!(rules[1].prefix, "/docs/");
    }

    #[test]
    fn test_parse_rules_strips_comments_and_wildcards() {
        let rules = parse_rules("User-agent: * # everyone\nDisallow: /tmp/* # scratch\n");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].prefix, "/tmp/");
    }

    #[test]
    fn test_parse_rules_empty_disallow_means_no_rule() {
        assert!(parse_rules("User-agent: *\nDisallow:\n").is_empty());
    }

    #[test]
    fn test_parse_rules_case_insensitive_fields() {
        let rules = parse_rules("USER-AGENT: *\nDISALLOW: /x/\n");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_policy_allow_wins_ties() {
        let policy =
            DomainPolicy::from_body("User-agent: *\nDisallow: /path/\nAllow: /path/\n");
        assert!(policy.is_allowed("/path/page"));
    }

    #[test]
    fn test_policy_longest_prefix_decides() {
        let policy = DomainPolicy::from_body(
            "User-agent: *\nAllow: /a/\nDisallow: /a/secret/\n",
        );
        assert!(policy.is_allowed("/a/open"));
        assert!(!policy.is_allowed("/a/secret/file"));
    }

    #[test]
    fn test_policy_no_match_allows() {
        let policy = DomainPolicy::from_body("User-agent: *\nDisallow: /private/\n");
        assert!(policy.is_allowed("/public/page"));
    }

    // ==================== Cache + fetch Tests ====================

    #[tokio::test]
    async fn test_is_allowed_blocks_disallowed_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
            )
            .mount(&server)
            .await;

        let cache = RobotsPolicyCache::new(100);
        let fetcher = fetcher();

        assert!(
            !cache
                .is_allowed(&format!("{}/private/doc.pdf", server.uri()), &fetcher)
                .await
        );
        assert!(
            cache
                .is_allowed(&format!("{}/public/doc.pdf", server.uri()), &fetcher)
                .await
        );
    }

    #[tokio::test]
    async fn test_robots_fetched_once_per_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\n"))
            .expect(1)
            .mount(&server)
            .await;

        let cache = RobotsPolicyCache::new(100);
        let fetcher = fetcher();
        for i in 0..5 {
            cache
                .is_allowed(&format!("{}/page-{i}", server.uri()), &fetcher)
                .await;
        }
        assert_eq!(cache.cached_domains().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_contact_fetches_robots_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/\n")
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(RobotsPolicyCache::new(100));
        let fetcher = Arc::new(fetcher());
        let mut handles = Vec::new();
        for i in 0..4 {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            let url = format!("{}/public/page-{i}", server.uri());
            handles.push(tokio::spawn(
                async move { cache.is_allowed(&url, &fetcher).await },
            ));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(cache.cached_domains().await, 1);
    }

    #[tokio::test]
    async fn test_slow_first_contact_does_not_block_cached_domains() {
        let slow = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private/\n")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&slow)
            .await;

        let fast = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&fast)
            .await;

        let cache = Arc::new(RobotsPolicyCache::new(100));
        let fetcher = Arc::new(fetcher());

        // Warm the cache for the fast origin before the slow fetch starts.
        assert!(
            cache
                .is_allowed(&format!("{}/warm", fast.uri()), &fetcher)
                .await
        );

        let slow_lookup = {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            let url = format!("{}/private/doc", slow.uri());
            tokio::spawn(async move { cache.is_allowed(&url, &fetcher).await })
        };
        // Let the spawned lookup reach its robots.txt fetch.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        assert!(
            cache
                .is_allowed(&format!("{}/cached", fast.uri()), &fetcher)
                .await
        );
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "cached lookup waited on another domain's robots fetch"
        );

        assert!(!slow_lookup.await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RobotsPolicyCache::new(100);
        assert!(
            cache
                .is_allowed(&format!("{}/anything", server.uri()), &fetcher())
                .await
        );
    }

    #[tokio::test]
    async fn test_unreachable_robots_allows() {
        // Nothing listens on port 1; the robots fetch fails and the
        // engine fails open.
        let cache = RobotsPolicyCache::new(100);
        assert!(cache.is_allowed("http://127.0.0.1:1/doc", &fetcher()).await);
    }

    #[tokio::test]
    async fn test_unparseable_url_allows_without_fetch() {
        let cache = RobotsPolicyCache::new(100);
        assert!(cache.is_allowed("not a url", &fetcher()).await);
        assert_eq!(cache.cached_domains().await, 0);
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recently_used_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        // Capacity 1: a second distinct origin evicts the first. Same host,
        // different port, counts as a different origin.
        let cache = RobotsPolicyCache::new(1);
        let fetcher = fetcher();
        cache
            .is_allowed(&format!("{}/a", server.uri()), &fetcher)
            .await;
        cache.is_allowed("http://127.0.0.1:1/b", &fetcher).await;
        assert_eq!(cache.cached_domains().await, 1);
    }
}
