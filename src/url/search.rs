use crate::config::{CrawlTarget, SessionInput};
use regex::Regex;
use std::sync::LazyLock;
use url::form_urlencoded;

/// Number of results the site renders per list page
pub const RESULTS_PER_PAGE: u32 = 20;

static ROWS_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"rows=\d+").unwrap());
static OFFSET_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"offset=\d+").unwrap());

/// Decorates a URL with the session parameters of the crawl
///
/// Adds, in order: the stay dates (`checkout_*` from the check-out date, then
/// `checkin_*` from the check-in date), the currency triple, the language and
/// the occupancy counts. A parameter block is only appended when it is not
/// already present after either `?` or `&`, which makes the function
/// idempotent.
///
/// # Examples
///
/// ```
/// use hotel_sweep::config::SessionInput;
/// use hotel_sweep::url::build_search_url;
///
/// let mut input = SessionInput::search("paris");
/// input.language = Some("en_gb".to_string());
///
/// let url = build_search_url("https://www.booking.com/searchresults.html", &input);
/// assert_eq!(
///     url,
///     "https://www.booking.com/searchresults.html?selected_currency=USD&changed_currency=1&top_currency=1&lang=en-gb"
/// );
/// assert_eq!(build_search_url(&url, &input), url);
/// ```
pub fn build_search_url(url: &str, input: &SessionInput) -> String {
    let mut url = url.to_string();
    if !url.contains('?') {
        url.push('?');
    }

    if let Some(stay) = &input.stay {
        let (cin, out) = (&stay.check_in, &stay.check_out);
        append_once(
            &mut url,
            &format!(
                "checkout_year={}&checkout_month={}&checkout_monthday={}",
                out.year, out.month, out.day
            ),
        );
        append_once(
            &mut url,
            &format!(
                "checkin_year={}&checkin_month={}&checkin_monthday={}",
                cin.year, cin.month, cin.day
            ),
        );
    }

    append_once(&mut url, &currency_params(&input.currency, "&"));

    if let Some(language) = &input.language {
        append_once(&mut url, &format!("lang={}", language.replace('_', "-")));
    }

    if let Some(adults) = input.adults.filter(|n| *n > 0) {
        append_once(&mut url, &format!("group_adults={}", adults));
    }

    if let Some(children) = input.children.filter(|n| *n > 0) {
        append_once(&mut url, &format!("group_children={}", children));
    }

    if let Some(rooms) = input.rooms.filter(|n| *n > 0) {
        append_once(&mut url, &format!("no_rooms={}", rooms));
    }

    url.replace("?&", "?")
}

/// Builds the URL every search crawl starts from
///
/// Seeded crawls have no search of their own; they get the canonical Paris
/// search, which the proxy validator uses as its known-good page.
pub fn search_start_url(input: &SessionInput) -> String {
    let (dest_type, query) = match &input.target {
        CrawlTarget::Search { query, dest_type } => (dest_type.as_str(), query.as_str()),
        CrawlTarget::StartUrls(_) => ("city", "paris"),
    };

    let query: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    let url = format!(
        "{}/searchresults.html?dest_type={}&ss={}&order={}",
        input.site_url, dest_type, query, input.sort_by
    );
    let url = build_search_url(&url, input);

    match input.target {
        CrawlTarget::Search { .. } => format!("{}&rows={}", url, RESULTS_PER_PAGE),
        CrawlTarget::StartUrls(_) => url,
    }
}

/// Rewrites a pagination link so it points at result page `index` (0-based)
///
/// `rows` is forced to the page size and `offset` to `index * page size`;
/// either parameter is appended when the template lacks it.
pub fn rewrite_pagination(template: &str, index: u32) -> String {
    let offset = format!("offset={}", RESULTS_PER_PAGE * index);
    let rows = format!("rows={}", RESULTS_PER_PAGE);

    let mut url = if ROWS_PARAM.is_match(template) {
        ROWS_PARAM.replace(template, rows.as_str()).into_owned()
    } else {
        with_param(template, &rows)
    };

    url = if OFFSET_PARAM.is_match(&url) {
        OFFSET_PARAM.replace(&url, offset.as_str()).into_owned()
    } else {
        with_param(&url, &offset)
    };

    url
}

/// Formats the currency triple with the given separator
pub(crate) fn currency_params(currency: &str, sep: &str) -> String {
    format!(
        "selected_currency={cur}{sep}changed_currency=1{sep}top_currency=1",
        cur = currency.to_uppercase(),
        sep = sep
    )
}

fn append_once(url: &mut String, params: &str) {
    let present = url.contains(&format!("&{}", params)) || url.contains(&format!("?{}", params));
    if !present {
        url.push('&');
        url.push_str(params);
    }
}

fn with_param(url: &str, param: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, param)
}
