//! Field extraction from loaded pages
//!
//! The crawl core decides *which* pages produce output; the extractors decide
//! *what* a record contains. Both work on a [`PageSnapshot`] so they never
//! touch the browser.

mod detail;
mod list;

pub use detail::{aggregate_rating, structured_data, JsonLdDetailExtractor};
pub use list::{ListItem, SelectorListExtractor};

use crate::browser::{BrowserResult, Document, Element, Page};
use crate::config::SessionInput;
use crate::SweepError;

/// Markup and final URL of a page at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    document: Document,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            document: Document::new(url, html),
        }
    }

    /// Captures the document currently loaded in `page`
    pub async fn capture(page: &dyn Page) -> BrowserResult<Self> {
        Ok(Self::new(page.url(), page.content().await?))
    }

    pub fn url(&self) -> &str {
        self.document.url()
    }

    pub fn html(&self) -> &str {
        self.document.html()
    }

    pub fn select(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        self.document.select(selector)
    }

    pub fn select_first(&self, selector: &str) -> BrowserResult<Option<Element>> {
        self.document.select_first(selector)
    }
}

/// Turns a hotel detail page into one output record
pub trait DetailExtractor: Send + Sync {
    /// # Arguments
    ///
    /// * `page` - The loaded detail page
    /// * `structured` - The page's JSON-LD object
    /// * `input` - Crawl input
    /// * `order` - Position of the hotel in the result list, when known
    fn extract(
        &self,
        page: &PageSnapshot,
        structured: &serde_json::Value,
        input: &SessionInput,
        order: Option<u32>,
    ) -> Result<serde_json::Value, SweepError>;
}

/// Turns a search-result page into summary items
pub trait ListExtractor: Send + Sync {
    fn extract(&self, page: &PageSnapshot, input: &SessionInput)
        -> Result<Vec<ListItem>, SweepError>;
}
