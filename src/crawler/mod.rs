//! Crawler module for hotel search and detail pages
//!
//! This module contains the core crawling logic, including:
//! - Seeding the queue from a search or explicit URLs
//! - Classifying loaded pages and queuing what they lead to
//! - Filter convergence and pagination
//! - The worker pool that drives browsers over the queue

mod classifier;
mod driver;
pub mod filters;
pub mod pagination;
mod request;
mod seed;

pub use classifier::{handle_page, CrawlContext, PageOutcome, PageState, LIST_PAGE_KEY};
pub use driver::{CrawlDriver, CrawlSummary, IDLE_WAIT};
pub use pagination::COUNT_ERROR_KEY;
pub use request::{CrawlRequest, RequestLabel};
pub use seed::{seed_queue, seed_requests};
