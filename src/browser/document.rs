//! Element queries over a loaded HTML document
//!
//! Markup is kept as text and parsed on every query, which keeps the types
//! `Send` and lets nested queries run on an element's own outer HTML.

use crate::browser::{BrowserError, BrowserResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// A snapshot of one DOM element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    html: String,
    text: String,
    attributes: HashMap<String, String>,
}

impl Element {
    /// Trimmed text content of the element and its descendants
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Raw value of an attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Non-empty `href` attribute
    pub fn href(&self) -> Option<&str> {
        self.attr("href").map(str::trim).filter(|href| !href.is_empty())
    }

    /// The `class` attribute, empty when absent
    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or_default()
    }

    pub fn outer_html(&self) -> &str {
        &self.html
    }

    /// Descendants matching `selector`
    pub fn select(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.html);
        Ok(fragment.select(&selector).map(Element::from_ref).collect())
    }

    /// First descendant matching `selector`
    pub fn select_first(&self, selector: &str) -> BrowserResult<Option<Element>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    fn from_ref(element: ElementRef<'_>) -> Self {
        Self {
            html: element.html(),
            text: element.text().collect(),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// A loaded document and the URL it was served from
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    url: String,
    html: String,
}

impl Document {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// All elements matching `selector`, in document order
    pub fn select(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&selector).map(Element::from_ref).collect())
    }

    /// First element matching `selector`
    pub fn select_first(&self, selector: &str) -> BrowserResult<Option<Element>> {
        Ok(self.select(selector)?.into_iter().next())
    }
}

fn parse_selector(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}
