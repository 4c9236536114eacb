//! Result-set pagination
//!
//! The first page of a result set links to its siblings and shows the total
//! result count. One `Page` request is queued per page of 20 results, built
//! from the first sibling link by rewriting its `rows`/`offset` parameters.

use crate::config::SessionInput;
use crate::crawler::{CrawlRequest, RequestLabel};
use crate::extract::PageSnapshot;
use crate::url::{build_search_url, resolve_href, rewrite_pagination, RESULTS_PER_PAGE};
use crate::SweepError;
use regex::Regex;
use std::sync::LazyLock;

pub const PAGE_LINK_SELECTOR: &str = ".bui-pagination__list a:not([aria-current])";
pub const COUNT_SELECTOR: &str = ".sorth1, .sr_header h1, .sr_header h2";
pub const RANGE_SELECTOR: &str = ".bui-pagination__info";

/// Key of the page markup saved when pagination cannot be discovered
pub const COUNT_ERROR_KEY: &str = "count_error.html";

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.,\s]").unwrap());

/// Parses a heading such as `"Paris: 1,234 properties found"` into `1234`
pub fn parse_result_count(text: &str) -> Option<u32> {
    let stripped = SEPARATORS.replace_all(text, "");
    DIGITS.find(&stripped)?.as_str().parse().ok()
}

/// Number of list pages needed for `results`
pub fn page_count(results: u32) -> u32 {
    results.div_ceil(RESULTS_PER_PAGE)
}

/// First ordinal of a "Showing 21 - 40" style range text
pub fn first_ordinal(text: &str) -> Option<u32> {
    DIGITS.find(text)?.as_str().parse().ok()
}

/// One `Page` request per page of the result set
///
/// # Errors
///
/// Fails with [`SweepError::MissingElement`] when the page has no sibling
/// link or no result-count heading. A heading without digits yields no
/// requests.
pub fn pagination_requests(
    page: &PageSnapshot,
    input: &SessionInput,
) -> Result<Vec<CrawlRequest>, SweepError> {
    let template = page
        .select_first(PAGE_LINK_SELECTOR)?
        .and_then(|link| link.href().map(str::to_string))
        .ok_or_else(|| SweepError::MissingElement {
            selector: PAGE_LINK_SELECTOR.to_string(),
        })?;
    let template = resolve_href(page.url(), &template)?;

    let heading = page
        .select_first(COUNT_SELECTOR)?
        .ok_or_else(|| SweepError::MissingElement {
            selector: COUNT_SELECTOR.to_string(),
        })?;

    let Some(results) = parse_result_count(heading.text()) else {
        tracing::warn!("No result count in '{}'", heading.text());
        return Ok(Vec::new());
    };

    let pages = page_count(results);
    tracing::info!("Pagination pages: {}", pages);

    Ok((0..pages)
        .map(|index| {
            let url = build_search_url(&rewrite_pagination(&template, index), input);
            CrawlRequest::new(url, RequestLabel::Page)
        })
        .collect())
}
