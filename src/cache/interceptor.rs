//! Per-fetch interception policy
//!
//! Every outgoing fetch is either aborted (static assets and trackers), served
//! from the [`ResponseCache`], or allowed through to the network. Network
//! responses announcing a `max-age` are offered back to the cache.

use crate::cache::{CachedResponse, ResponseCache};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// URL fragments whose fetches are aborted without touching the network
pub const BLOCKED_PATTERNS: &[&str] = &[
    ".js",
    ".png",
    ".jpg",
    ".gif",
    ".css",
    "static/fonts",
    "js_tracking",
    "facebook.com",
    "googleapis.com",
    "secure.booking.com",
    "booking.com/logo",
    "booking.com/navigation_times",
];

static MAX_AGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"max-age=(\d+)").unwrap());

/// What to do with an outgoing fetch
#[derive(Debug, Clone, PartialEq)]
pub enum InterceptDecision {
    /// Drop the fetch
    Abort,
    /// Answer the fetch with a cached response
    Respond(CachedResponse),
    /// Let the fetch go to the network
    Continue,
}

/// Interception policy shared by all pages of a crawl
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    cache: Arc<ResponseCache>,
}

impl RequestInterceptor {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Decides the fate of an outgoing fetch
    pub fn on_request(&self, url: &str) -> InterceptDecision {
        if is_blocked(url) {
            tracing::trace!("Aborting blocked fetch {}", url);
            return InterceptDecision::Abort;
        }

        match self.cache.lookup(url) {
            Some(cached) => {
                tracing::debug!("Serving {} from cache", url);
                InterceptDecision::Respond(cached)
            }
            None => InterceptDecision::Continue,
        }
    }

    /// Offers a network response to the cache
    ///
    /// # Returns
    ///
    /// `true` when the response was cached
    pub fn on_response(
        &self,
        url: &str,
        status: u16,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> bool {
        let max_age = headers
            .get("cache-control")
            .and_then(|value| parse_max_age(value))
            .unwrap_or(0);

        if max_age == 0 || !self.cache.is_enabled() {
            return false;
        }

        self.cache
            .store(url, status, headers.clone(), body.to_vec(), max_age)
    }
}

/// Returns true when the URL matches the fixed deny-list
pub fn is_blocked(url: &str) -> bool {
    BLOCKED_PATTERNS.iter().any(|pattern| url.contains(pattern))
}

/// Extracts `max-age` (seconds) from a `Cache-Control` header value
pub fn parse_max_age(cache_control: &str) -> Option<u64> {
    MAX_AGE
        .captures(cache_control)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse().ok())
}
