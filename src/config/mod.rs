//! Configuration module for Hotel-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving them into the immutable [`SessionInput`] shared by the crawl.
//!
//! # Example
//!
//! ```no_run
//! use hotel_sweep::config::{load_config, resolve};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! let input = resolve(&config).unwrap();
//! println!("Sorting results by: {}", input.sort_by);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlTarget, CrawlerConfig, FilterConfig, OutputConfig, PriceBand, ProxyConfig,
    ProxySettings, SearchConfig, SessionInput, StayDate, StayDates, DEFAULT_PROXY_URL,
    DEFAULT_SITE_URL, DEFAULT_SORT_BY,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{resolve, PROXY_PASSWORD_ENV};
