use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Default site searched when no `site-url` is configured
pub const DEFAULT_SITE_URL: &str = "https://www.booking.com";

/// Default result ordering, also used as an authenticity marker in list URLs
pub const DEFAULT_SORT_BY: &str = "bayesian_review_score";

/// Default proxy endpoint
pub const DEFAULT_PROXY_URL: &str = "http://proxy.apify.com:8000";

/// Main configuration structure for Hotel-Sweep, as read from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    pub output: OutputConfig,
}

/// What to crawl and with which session parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Free-text destination query (mutually exclusive with `start-urls`)
    #[serde(default)]
    pub query: Option<String>,

    /// Explicit URLs to start from (mutually exclusive with `query`)
    #[serde(rename = "start-urls", default)]
    pub start_urls: Vec<String>,

    /// Destination type for search queries
    #[serde(rename = "dest-type", default)]
    pub dest_type: Option<String>,

    /// Check-in date (MM-DD-YYYY or MM/DD/YYYY)
    #[serde(rename = "check-in", default)]
    pub check_in: Option<String>,

    /// Check-out date (MM-DD-YYYY or MM/DD/YYYY)
    #[serde(rename = "check-out", default)]
    pub check_out: Option<String>,

    /// ISO currency code every page must be served in
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub adults: Option<u32>,

    #[serde(default)]
    pub children: Option<u32>,

    #[serde(default)]
    pub rooms: Option<u32>,

    #[serde(rename = "sort-by", default)]
    pub sort_by: Option<String>,

    /// Detail pages rated at or below this score are dropped
    #[serde(rename = "min-score", default, deserialize_with = "number_or_string")]
    pub min_score: Option<f64>,
}

/// Filter selections that must converge before results are enumerated
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "property-type", default = "none_string")]
    pub property_type: String,

    #[serde(rename = "min-max-price", default = "none_string")]
    pub min_max_price: String,

    #[serde(rename = "use-filters", default)]
    pub use_filters: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            property_type: none_string(),
            min_max_price: none_string(),
            use_filters: false,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Base URL of the listing site
    #[serde(rename = "site-url", default = "default_site_url")]
    pub site_url: String,

    /// Number of result pages to seed directly (search mode without filters)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Emit list summaries instead of visiting detail pages
    #[serde(default)]
    pub simple: bool,

    #[serde(rename = "cache-responses", default = "default_true")]
    pub cache_responses: bool,

    /// Validate proxy sessions before handing a browser to the crawl
    #[serde(rename = "test-proxy", default)]
    pub test_proxy: bool,

    #[serde(rename = "max-concurrency", default = "default_concurrency")]
    pub max_concurrency: u32,

    #[serde(rename = "max-request-retries", default = "default_retries")]
    pub max_request_retries: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            max_pages: None,
            simple: false,
            cache_responses: true,
            test_proxy: false,
            max_concurrency: default_concurrency(),
            max_request_retries: default_retries(),
        }
    }
}

/// Proxy configuration. The crawler refuses to run without it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_url")]
    pub url: String,

    #[serde(default)]
    pub groups: Vec<String>,

    /// Falls back to the `PROXY_PASSWORD` environment variable
    #[serde(default)]
    pub password: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the queue, state and dataset
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn none_string() -> String {
    "none".to_string()
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> u32 {
    4
}

fn default_retries() -> u32 {
    3
}

/// Accepts `min-score = 8` as well as `min-score = "8.0"`
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Float(f64),
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Float(value)) => Ok(Some(value)),
        Some(Raw::Int(value)) => Ok(Some(value as f64)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("min-score '{}' is not a number", text))),
    }
}

/// The fixed, ordered set of price bands offered by the site's price filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBand {
    UpTo50,
    From50To100,
    From100To150,
    From150To200,
    Over200,
}

impl PriceBand {
    /// All bands in the order the site renders them
    pub const ALL: [PriceBand; 5] = [
        PriceBand::UpTo50,
        PriceBand::From50To100,
        PriceBand::From100To150,
        PriceBand::From150To200,
        PriceBand::Over200,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpTo50 => "0-50",
            Self::From50To100 => "50-100",
            Self::From100To150 => "100-150",
            Self::From150To200 => "150-200",
            Self::Over200 => "200+",
        }
    }

    /// Position of this band inside the price filter group
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|band| band == self)
            .unwrap_or_default()
    }
}

impl FromStr for PriceBand {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|band| band.label() == s.trim())
            .ok_or_else(|| ConfigError::InvalidPriceBand(s.to_string()))
    }
}

impl fmt::Display for PriceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A calendar date kept in the textual form the user supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl FromStr for StayDate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(['-', '/']).collect();
        let [month, day, year] = parts.as_slice() else {
            return Err(ConfigError::InvalidDate(s.to_string()));
        };

        let parsed = (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>());
        match parsed {
            (Ok(y), Ok(m), Ok(d)) if chrono::NaiveDate::from_ymd_opt(y, m, d).is_some() => {
                Ok(Self {
                    year: year.to_string(),
                    month: month.to_string(),
                    day: day.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidDate(s.to_string())),
        }
    }
}

/// Check-in and check-out dates of the searched stay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayDates {
    pub check_in: StayDate,
    pub check_out: StayDate,
}

/// Where the crawl starts
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlTarget {
    /// Generated search over a destination
    Search { query: String, dest_type: String },
    /// Seeded crawl from explicit URLs
    StartUrls(Vec<String>),
}

/// Resolved proxy settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySettings {
    pub url: String,
    pub groups: Vec<String>,
    pub password: String,
}

/// Immutable crawl input, resolved once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub target: CrawlTarget,
    pub stay: Option<StayDates>,
    pub currency: String,
    pub language: Option<String>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub rooms: Option<u32>,
    pub sort_by: String,
    pub min_score: f64,
    pub property_type: Option<String>,
    pub min_max_price: Option<PriceBand>,
    pub use_filters: bool,
    pub max_pages: Option<u32>,
    pub simple: bool,
    pub cache_responses: bool,
    pub test_proxy: bool,
    pub max_concurrency: usize,
    pub max_request_retries: u32,
    pub site_url: String,
    pub proxy: ProxySettings,
}

impl SessionInput {
    /// Builds an input for a search crawl with every optional setting at its default
    pub fn search(query: &str) -> Self {
        Self {
            target: CrawlTarget::Search {
                query: query.to_string(),
                dest_type: "city".to_string(),
            },
            stay: None,
            currency: default_currency(),
            language: None,
            adults: None,
            children: None,
            rooms: None,
            sort_by: DEFAULT_SORT_BY.to_string(),
            min_score: 0.0,
            property_type: None,
            min_max_price: None,
            use_filters: false,
            max_pages: None,
            simple: false,
            cache_responses: true,
            test_proxy: false,
            max_concurrency: default_concurrency() as usize,
            max_request_retries: default_retries(),
            site_url: default_site_url(),
            proxy: ProxySettings {
                url: default_proxy_url(),
                groups: Vec::new(),
                password: String::new(),
            },
        }
    }

    /// Builds an input for a seeded crawl over the given URLs
    pub fn seeded(urls: Vec<String>) -> Self {
        Self {
            target: CrawlTarget::StartUrls(urls),
            ..Self::search("")
        }
    }

    /// Returns true when the crawl was seeded from explicit URLs
    pub fn is_seeded(&self) -> bool {
        matches!(self.target, CrawlTarget::StartUrls(_))
    }

    /// Returns true when any filter-convergence step is configured
    pub fn has_filters(&self) -> bool {
        self.use_filters || self.property_type.is_some() || self.min_max_price.is_some()
    }
}
