//! URL handling module for Hotel-Sweep
//!
//! Pure functions that decorate URLs with the session parameters of a crawl
//! (dates, currency, language, occupancy), normalize links found on pages and
//! derive pagination URLs. Every function here is total and idempotent.

mod normalize;
mod search;

// Re-export main functions
pub use normalize::{normalize_child_link, resolve_href};
pub use search::{build_search_url, rewrite_pagination, search_start_url, RESULTS_PER_PAGE};
