use crate::config::SessionInput;
use crate::url::search::currency_params;
use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a link discovered on a page into a crawlable URL
///
/// # Normalization Steps
///
/// 1. Drop the in-page anchor (everything from `#`)
/// 2. Append `lang` when the link carries no language parameter
/// 3. Append the currency triple when the link carries no currency parameter
/// 4. Collapse runs of the separator and remove a separator right after `?`
///
/// Missing parameters are joined with `sep`, which lets the same routine serve
/// both `&`-separated and `;`-separated link styles.
///
/// # Examples
///
/// ```
/// use hotel_sweep::config::SessionInput;
/// use hotel_sweep::url::normalize_child_link;
///
/// let input = SessionInput::search("paris");
/// let link = normalize_child_link("https://www.booking.com/hotel/fr/abc.html?label=gen#map", "&", &input);
/// assert_eq!(
///     link,
///     "https://www.booking.com/hotel/fr/abc.html?label=gen&selected_currency=USD&changed_currency=1&top_currency=1"
/// );
/// ```
pub fn normalize_child_link(href: &str, sep: &str, input: &SessionInput) -> String {
    let mut link = href
        .split('#')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    if !link.contains('?') {
        link.push('?');
    }

    if let Some(language) = &input.language {
        if !link.contains("lang") {
            link.push_str(sep);
            link.push_str(&format!("lang={}", language.replace('_', "-")));
        }
    }

    if !link.contains("currency") {
        link.push_str(sep);
        link.push_str(&currency_params(&input.currency, sep));
    }

    collapse_separators(&link, sep)
}

/// Resolves an `href` attribute against the URL of the page it was found on
pub fn resolve_href(base: &str, href: &str) -> UrlResult<String> {
    let base_url = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;

    base_url
        .join(href.trim())
        .map(|url| url.to_string())
        .map_err(|_| UrlError::Unresolvable {
            base: base.to_string(),
            href: href.to_string(),
        })
}

fn collapse_separators(link: &str, sep: &str) -> String {
    if sep.is_empty() {
        return link.to_string();
    }

    let doubled = sep.repeat(2);
    let mut collapsed = link.to_string();
    while collapsed.contains(&doubled) {
        collapsed = collapsed.replace(&doubled, sep);
    }

    let collapsed = collapsed.replace(&format!("?{}", sep), "?");
    match collapsed.strip_suffix('?') {
        Some(stripped) => stripped.to_string(),
        None => collapsed,
    }
}
