//! Filter convergence checks and the requests that apply missing filters
//!
//! Search-result pages carry their filter sidebar as `.filterelement` links;
//! an applied filter has `active` in its class list. Filters are applied by
//! following their links, each queued under `"<label>_0"` so the same filter
//! is never queued twice no matter how many pages point at it.

use crate::browser::Element;
use crate::config::{PriceBand, SessionInput};
use crate::crawler::{CrawlRequest, RequestLabel};
use crate::extract::PageSnapshot;
use crate::url::{normalize_child_link, resolve_href};
use crate::SweepError;

pub const FILTER_SELECTOR: &str = ".filterelement";
pub const ACTIVE_FILTER_SELECTOR: &str = ".filterelement.active";
pub const FILTER_LABEL_SELECTOR: &str = ".filter_label";
pub const FILTER_GROUP_SELECTOR: &str = ".filteroptions";

fn is_active(filter: &Element) -> bool {
    filter.class_name().contains("active")
}

fn filter_label(filter: &Element) -> Result<Option<String>, SweepError> {
    Ok(filter
        .select_first(FILTER_LABEL_SELECTOR)?
        .map(|label| label.text().to_string()))
}

/// Builds the queued request that follows `filter`
fn filter_request(
    page: &PageSnapshot,
    filter: &Element,
    key: &str,
    input: &SessionInput,
) -> Result<Option<CrawlRequest>, SweepError> {
    let Some(href) = filter.href() else {
        return Ok(None);
    };
    let url = normalize_child_link(&resolve_href(page.url(), href)?, "&", input);
    Ok(Some(
        CrawlRequest::new(url, RequestLabel::Page).with_key(format!("{}_0", key)),
    ))
}

/// The price filters of the first filter group, in band order
fn price_filters(page: &PageSnapshot) -> Result<Vec<Element>, SweepError> {
    let group = page
        .select_first(FILTER_GROUP_SELECTOR)?
        .ok_or_else(|| SweepError::MissingElement {
            selector: FILTER_GROUP_SELECTOR.to_string(),
        })?;
    Ok(group.select(FILTER_SELECTOR)?)
}

fn price_filter(page: &PageSnapshot, band: PriceBand) -> Result<Element, SweepError> {
    price_filters(page)?
        .into_iter()
        .nth(band.index())
        .ok_or_else(|| SweepError::MissingElement {
            selector: format!("{} {}:nth({})", FILTER_GROUP_SELECTOR, FILTER_SELECTOR, band.index()),
        })
}

/// True when at least one filter is applied
pub fn is_filtered(page: &PageSnapshot) -> Result<bool, SweepError> {
    Ok(page.select_first(ACTIVE_FILTER_SELECTOR)?.is_some())
}

/// True when the filter labelled `property_type` is applied
///
/// A page that offers no such filter counts as converged.
pub fn is_property_type_set(page: &PageSnapshot, property_type: &str) -> Result<bool, SweepError> {
    for filter in page.select(FILTER_SELECTOR)? {
        if filter_label(&filter)?.as_deref() == Some(property_type) {
            return Ok(is_active(&filter));
        }
    }
    Ok(true)
}

/// True when the filter for `band` is applied
///
/// # Errors
///
/// Fails with [`SweepError::MissingElement`] when the page has no price
/// filter group or the group has fewer filters than price bands.
pub fn is_price_band_set(page: &PageSnapshot, band: PriceBand) -> Result<bool, SweepError> {
    Ok(is_active(&price_filter(page, band)?))
}

/// The request applying the configured property type, if the page offers it
pub fn property_type_request(
    page: &PageSnapshot,
    property_type: &str,
    input: &SessionInput,
) -> Result<Option<CrawlRequest>, SweepError> {
    for filter in page.select(FILTER_SELECTOR)? {
        if let Some(label) = filter_label(&filter)? {
            if label == property_type {
                tracing::info!("Using property type filter: {}", label);
                return filter_request(page, &filter, &label, input);
            }
        }
    }
    Ok(None)
}

/// The request applying the configured price band
pub fn price_band_request(
    page: &PageSnapshot,
    band: PriceBand,
    input: &SessionInput,
) -> Result<Option<CrawlRequest>, SweepError> {
    let filter = price_filter(page, band)?;
    let label = filter_label(&filter)?.unwrap_or_else(|| band.label().to_string());
    tracing::info!("Using price filter: {}", label);
    filter_request(page, &filter, &label, input)
}

/// One request per filter link on the page
pub fn filter_requests(
    page: &PageSnapshot,
    input: &SessionInput,
) -> Result<Vec<CrawlRequest>, SweepError> {
    let mut requests = Vec::new();
    for filter in page.select(FILTER_SELECTOR)? {
        let text = match filter_label(&filter)? {
            Some(label) if !label.is_empty() => label,
            _ => filter.text().to_string(),
        };
        if let Some(request) = filter_request(page, &filter, &text, input)? {
            requests.push(request);
        }
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_URL: &str =
        "https://www.booking.com/searchresults.html?ss=Paris&order=bayesian_review_score";

    fn sidebar(active_price: Option<usize>, active_type: bool) -> String {
        let prices: String = PriceBand::ALL
            .iter()
            .enumerate()
            .map(|(i, band)| {
                format!(
                    r#"<a class="filterelement{}" href="/searchresults.html?nflt=pri%3D{}"><span class="filter_label">{}</span></a>"#,
                    if active_price == Some(i) { " active" } else { "" },
                    i + 1,
                    band.label()
                )
            })
            .collect();
        format!(
            r#"<html><body>
            <div class="filteroptions">{}</div>
            <div class="filteroptions">
                <a class="filterelement{}" href="/searchresults.html?nflt=ht_id%3D204"><span class="filter_label">Hotels</span></a>
                <a class="filterelement" href="/searchresults.html?nflt=ht_id%3D201#top"><span class="filter_label">Apartments</span></a>
            </div>
            </body></html>"#,
            prices,
            if active_type { " active" } else { "" }
        )
    }

    fn page(html: &str) -> PageSnapshot {
        PageSnapshot::new(SEARCH_URL, html)
    }

    #[test]
    fn test_is_filtered() {
        assert!(!is_filtered(&page(&sidebar(None, false))).unwrap());
        assert!(is_filtered(&page(&sidebar(Some(1), false))).unwrap());
    }

    #[test]
    fn test_property_type_set() {
        assert!(!is_property_type_set(&page(&sidebar(None, false)), "Hotels").unwrap());
        assert!(is_property_type_set(&page(&sidebar(None, true)), "Hotels").unwrap());
        assert!(is_property_type_set(&page(&sidebar(None, false)), "Castles").unwrap());
    }

    #[test]
    fn test_price_band_set() {
        let html = sidebar(Some(2), false);
        assert!(is_price_band_set(&page(&html), PriceBand::From100To150).unwrap());
        assert!(!is_price_band_set(&page(&html), PriceBand::From50To100).unwrap());
    }

    #[test]
    fn test_price_band_without_group() {
        let result = is_price_band_set(&page("<html></html>"), PriceBand::UpTo50);
        assert!(matches!(result, Err(SweepError::MissingElement { .. })));
    }

    #[test]
    fn test_price_band_request_uses_band_index() {
        let input = SessionInput::search("Paris");
        let request = price_band_request(&page(&sidebar(None, false)), PriceBand::From100To150, &input)
            .unwrap()
            .unwrap();

        assert_eq!(request.unique_key, "100-150_0");
        assert_eq!(request.label, RequestLabel::Page);
        assert!(request
            .url
            .starts_with("https://www.booking.com/searchresults.html?nflt=pri%3D3"));
        assert!(request.url.contains("selected_currency=USD"));
    }

    #[test]
    fn test_property_type_request() {
        let input = SessionInput::search("Paris");
        let request = property_type_request(&page(&sidebar(None, false)), "Apartments", &input)
            .unwrap()
            .unwrap();

        assert_eq!(request.unique_key, "Apartments_0");
        assert!(!request.url.contains('#'));

        assert!(property_type_request(&page(&sidebar(None, false)), "Castles", &input)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_filter_requests_keys() {
        let input = SessionInput::search("Paris");
        let requests = filter_requests(&page(&sidebar(None, false)), &input).unwrap();

        let keys: Vec<&str> = requests.iter().map(|r| r.unique_key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["0-50_0", "50-100_0", "100-150_0", "150-200_0", "200+_0", "Hotels_0", "Apartments_0"]
        );
    }
}
