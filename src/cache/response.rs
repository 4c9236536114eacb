//! In-memory response cache shared by every worker
//!
//! Entries expire after the `max-age` the server announced. Expired entries are
//! evicted lazily on lookup; nothing else bounds the map for the lifetime of a
//! crawl run.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A captured response that can be replayed instead of going to the network
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers with lowercase names
    pub headers: HashMap<String, String>,

    /// Raw response body
    pub body: Vec<u8>,

    /// The entry must not be served at or after this instant
    pub expires_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Checks whether the entry may still be served at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Concurrency-safe URL → response map
///
/// Writes follow a compare-and-swap discipline: a new entry is installed only
/// when no unexpired entry exists for the URL, so a live entry is never
/// replaced while another worker may be replaying it.
#[derive(Debug)]
pub struct ResponseCache {
    enabled: bool,
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    /// Creates an empty cache. A disabled cache ignores every store.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether stores take effect
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the cached response for `url` if it is still fresh
    pub fn lookup(&self, url: &str) -> Option<CachedResponse> {
        self.lookup_at(url, Utc::now())
    }

    /// Stores a response for `max_age_secs` seconds
    ///
    /// # Returns
    ///
    /// * `true` - The entry was installed
    /// * `false` - Caching is disabled, `max_age_secs` is zero, or a fresh
    ///   entry already exists for the URL
    pub fn store(
        &self,
        url: &str,
        status: u16,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        max_age_secs: u64,
    ) -> bool {
        self.store_at(url, status, headers, body, max_age_secs, Utc::now())
    }

    /// Number of entries currently held, fresh or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drops every expired entry and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        before - entries.len()
    }

    fn lookup_at(&self, url: &str, now: DateTime<Utc>) -> Option<CachedResponse> {
        let mut entries = self.entries();
        match entries.get(url) {
            Some(entry) if entry.is_fresh_at(now) => Some(entry.clone()),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    fn store_at(
        &self,
        url: &str,
        status: u16,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        max_age_secs: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.enabled || max_age_secs == 0 {
            return false;
        }

        let expires_at = i64::try_from(max_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|max_age| now.checked_add_signed(max_age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries();
        if entries.get(url).is_some_and(|entry| entry.is_fresh_at(now)) {
            tracing::trace!("Keeping live cache entry for {}", url);
            return false;
        }

        entries.insert(
            url.to_string(),
            CachedResponse {
                status,
                headers,
                body,
                expires_at,
            },
        );
        true
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
