//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RequestState`: Lifecycle of a queued request (pending, in progress, handled, failed)
//! - `CrawlProgress`: Names of list items already emitted in simple mode

mod progress;
mod request_state;

pub use progress::{CrawlProgress, PROGRESS_KEY};
pub use request_state::RequestState;
