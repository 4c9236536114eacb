//! Simple-mode crawl progress
//!
//! Remembers which list items were already emitted so a resumed run does not
//! emit them again. The set is written to the key-value store only when the
//! crawl is asked to shut down.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key under which progress is persisted
pub const PROGRESS_KEY: &str = "STATE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    crawled: HashSet<String>,
}

impl CrawlProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.crawled.contains(name)
    }

    pub fn len(&self) -> usize {
        self.crawled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawled.is_empty()
    }

    /// Records `name`, returning false if it was already emitted
    pub fn mark(&mut self, name: &str) -> bool {
        self.crawled.insert(name.to_string())
    }

    /// Keeps the items whose name has not been emitted yet and records them
    ///
    /// Duplicates within `items` are dropped as well, so each name passes at
    /// most once.
    pub fn retain_new<T, F>(&mut self, items: Vec<T>, name: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        items
            .into_iter()
            .filter(|item| self.crawled.insert(name(item).to_string()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_new() {
        let mut progress = CrawlProgress::new();
        progress.mark("Hotel A");

        let items = vec!["Hotel A", "Hotel B", "Hotel B", "Hotel C"];
        let fresh = progress.retain_new(items, |name| *name);

        assert_eq!(fresh, vec!["Hotel B", "Hotel C"]);
        assert_eq!(progress.len(), 3);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut progress = CrawlProgress::new();
        progress.mark("Hotel A");

        let restored = CrawlProgress::from_json(&progress.to_json().unwrap()).unwrap();
        assert!(restored.contains("Hotel A"));
        assert_eq!(restored, progress);
    }

    #[test]
    fn test_reads_plain_shape() {
        let restored = CrawlProgress::from_json(br#"{"crawled":["Hotel Z"]}"#).unwrap();
        assert!(restored.contains("Hotel Z"));
    }
}
