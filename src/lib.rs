//! Hotel-Sweep: a session-aware crawler for hotel listing sites
//!
//! This crate discovers search-result pages, converges the requested filters,
//! paginates the results and extracts either list summaries or full detail
//! records. Every fetched page is checked for authenticity (currency, redirect
//! and URL markers) and tainted fetches are retried through a fresh proxy
//! session without duplicating queued work.

pub mod browser;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Hotel-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected element not found: {selector}")]
    MissingElement { selector: String },

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("No working proxy session found after {attempts} attempts")]
    NoWorkingProxy { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date '{0}', expected MM-DD-YYYY or MM/DD/YYYY")]
    InvalidDate(String),

    #[error("Invalid price band '{0}'")]
    InvalidPriceBand(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Cannot resolve link '{href}' against {base}")]
    Unresolvable { base: String, href: String },
}

/// Result type alias for Hotel-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, SessionInput};
pub use crawler::{CrawlRequest, RequestLabel};
pub use state::CrawlProgress;
pub use url::{build_search_url, normalize_child_link};
