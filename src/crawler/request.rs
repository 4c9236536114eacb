//! Queued crawl requests

use std::fmt;

/// What kind of page a request points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLabel {
    /// A search-result page that still has to converge filters and paginate
    Start,
    /// A paginated search-result page
    Page,
    /// A hotel detail page, with its position in the result list when known
    Detail { order: Option<u32> },
}

impl RequestLabel {
    pub fn is_detail(&self) -> bool {
        matches!(self, Self::Detail { .. })
    }

    /// Name used in logs and in the database
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Page => "page",
            Self::Detail { .. } => "detail",
        }
    }

    /// Rebuilds a label from its database columns
    pub fn from_parts(name: &str, order: Option<u32>) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "page" => Some(Self::Page),
            "detail" => Some(Self::Detail { order }),
            _ => None,
        }
    }

    /// Result-list position carried by detail requests
    pub fn order(&self) -> Option<u32> {
        match self {
            Self::Detail { order } => *order,
            _ => None,
        }
    }
}

impl fmt::Display for RequestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A unit of work in the request queue
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub url: String,
    pub label: RequestLabel,
    /// Deduplication key; the queue ignores a second request with the same key
    pub unique_key: String,
    pub retry_count: u32,
    pub error_messages: Vec<String>,
}

impl CrawlRequest {
    /// A request keyed by its URL
    pub fn new(url: impl Into<String>, label: RequestLabel) -> Self {
        let url = url.into();
        Self {
            unique_key: url.clone(),
            url,
            label,
            retry_count: 0,
            error_messages: Vec::new(),
        }
    }

    pub fn with_key(mut self, unique_key: impl Into<String>) -> Self {
        self.unique_key = unique_key.into();
        self
    }

    /// A copy of this request under a random key
    ///
    /// Used to re-run a page whose fetch was tainted by the proxy, without
    /// colliding with the handled original. The retry count and error
    /// messages carry over so the copy stays within the same retry budget.
    pub fn with_random_key(&self) -> Self {
        Self {
            unique_key: format!("{}", rand::random::<u64>()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keys_by_url() {
        let request = CrawlRequest::new("https://www.booking.com/a", RequestLabel::Start);
        assert_eq!(request.unique_key, "https://www.booking.com/a");
        assert_eq!(request.retry_count, 0);
    }

    #[test]
    fn test_with_key() {
        let request = CrawlRequest::new("https://www.booking.com/a", RequestLabel::Start)
            .with_key("Hotels_0");
        assert_eq!(request.unique_key, "Hotels_0");
    }

    #[test]
    fn test_random_key_copy() {
        let mut request = CrawlRequest::new(
            "https://www.booking.com/hotel/fr/a.html",
            RequestLabel::Detail { order: Some(3) },
        );
        request.retry_count = 2;
        request.error_messages.push("boom".to_string());

        let copy = request.with_random_key();
        assert_eq!(copy.url, request.url);
        assert_eq!(copy.label, request.label);
        assert_ne!(copy.unique_key, request.unique_key);
        assert_eq!(copy.retry_count, 2);
        assert_eq!(copy.error_messages, vec!["boom".to_string()]);
    }

    #[test]
    fn test_label_parts() {
        for label in [
            RequestLabel::Start,
            RequestLabel::Page,
            RequestLabel::Detail { order: Some(21) },
            RequestLabel::Detail { order: None },
        ] {
            assert_eq!(RequestLabel::from_parts(label.name(), label.order()), Some(label));
        }
        assert_eq!(RequestLabel::from_parts("bogus", None), None);
    }
}
