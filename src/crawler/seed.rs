//! Initial requests of a crawl

use crate::config::{CrawlTarget, SessionInput};
use crate::crawler::{CrawlRequest, RequestLabel};
use crate::storage::{RequestQueue, StorageResult};
use crate::url::{build_search_url, rewrite_pagination, search_start_url};

/// Builds the requests a crawl starts from
///
/// A search crawl starts from the generated search page. When a page cap is
/// set and neither generic filters nor a property type has to converge first,
/// the capped sibling pages are queued right away as well.
///
/// A seeded crawl starts from the given URLs, decorated with the session
/// parameters; URLs pointing at a hotel go straight to detail handling.
pub fn seed_requests(input: &SessionInput) -> Vec<CrawlRequest> {
    match &input.target {
        CrawlTarget::Search { .. } => {
            let start = search_start_url(input);
            let mut requests = vec![CrawlRequest::new(start.as_str(), RequestLabel::Start)];

            if !input.use_filters && input.property_type.is_none() {
                if let Some(max_pages) = input.max_pages {
                    requests.extend((1..=max_pages).map(|index| {
                        CrawlRequest::new(rewrite_pagination(&start, index), RequestLabel::Page)
                    }));
                }
            }
            requests
        }
        CrawlTarget::StartUrls(urls) => urls
            .iter()
            .map(|url| {
                let url = build_search_url(url, input);
                let label = if url.contains("/hotel/") {
                    RequestLabel::Detail { order: None }
                } else {
                    RequestLabel::Start
                };
                CrawlRequest::new(url, label)
            })
            .collect(),
    }
}

/// Adds the seed requests to `queue`, returning how many were new
pub fn seed_queue<Q: RequestQueue>(queue: &mut Q, input: &SessionInput) -> StorageResult<usize> {
    let mut added = 0;
    for request in seed_requests(input) {
        if queue.add_request(&request, false)? {
            added += 1;
        }
    }
    Ok(added)
}
