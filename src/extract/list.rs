//! Summary items from search-result pages

use crate::config::SessionInput;
use crate::extract::{ListExtractor, PageSnapshot};
use crate::url::resolve_href;
use crate::SweepError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());

/// One hotel as shown in a result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub name: String,
    pub url: String,
    pub rating: Option<f64>,
    pub reviews: Option<u32>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub currency: String,
}

/// Reads list items with CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorListExtractor {
    pub item: String,
    pub name: String,
    pub link: String,
    pub rating: String,
    pub reviews: String,
    pub price: String,
    pub location: String,
}

impl Default for SelectorListExtractor {
    fn default() -> Self {
        Self {
            item: ".sr_item".to_string(),
            name: ".sr-hotel__name".to_string(),
            link: ".hotel_name_link".to_string(),
            rating: ".bui-review-score__badge".to_string(),
            reviews: ".bui-review-score__text".to_string(),
            price: ".bui-price-display__value, .price".to_string(),
            location: ".sr_card_address_line, .address".to_string(),
        }
    }
}

fn first_number(text: &str) -> Option<&str> {
    NUMBER.find(text).map(|m| m.as_str())
}

impl ListExtractor for SelectorListExtractor {
    fn extract(
        &self,
        page: &PageSnapshot,
        input: &SessionInput,
    ) -> Result<Vec<ListItem>, SweepError> {
        let mut items = Vec::new();

        for card in page.select(&self.item)? {
            let Some(name) = card
                .select_first(&self.name)?
                .map(|name| name.text().to_string())
                .filter(|name| !name.is_empty())
            else {
                continue;
            };

            let Some(href) = card
                .select_first(&self.link)?
                .and_then(|link| link.href().map(str::to_string))
            else {
                tracing::debug!("List item '{}' has no link", name);
                continue;
            };

            let text_of = |selector: &str| -> Result<Option<String>, SweepError> {
                Ok(card
                    .select_first(selector)?
                    .map(|element| element.text().to_string())
                    .filter(|text| !text.is_empty()))
            };

            let rating = text_of(&self.rating)?
                .as_deref()
                .and_then(first_number)
                .and_then(|n| n.replace(',', ".").parse().ok());
            let reviews = text_of(&self.reviews)?.and_then(|text| {
                text.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .ok()
            });

            items.push(ListItem {
                name,
                url: resolve_href(page.url(), &href)?,
                rating,
                reviews,
                price: text_of(&self.price)?,
                location: text_of(&self.location)?,
                currency: input.currency.clone(),
            });
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"
        <html><body>
        <div class="sr_item">
            <span class="sr-hotel__name"> Hotel du Nord </span>
            <a class="hotel_name_link" href="/hotel/fr/nord.html?label=gen173">link</a>
            <div class="bui-review-score__badge">8,5</div>
            <div class="bui-review-score__text">1,204 reviews</div>
            <div class="bui-price-display__value">US$120</div>
        </div>
        <div class="sr_item">
            <span class="sr-hotel__name">No Link Inn</span>
        </div>
        <div class="sr_item">
            <span class="sr-hotel__name">Le Marais</span>
            <a class="hotel_name_link" href="https://www.booking.com/hotel/fr/marais.html">link</a>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_items() {
        let page = PageSnapshot::new("https://www.booking.com/searchresults.html?ss=Paris", RESULTS);
        let input = SessionInput::search("Paris");

        let items = SelectorListExtractor::default().extract(&page, &input).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].name, "Hotel du Nord");
        assert_eq!(
            items[0].url,
            "https://www.booking.com/hotel/fr/nord.html?label=gen173"
        );
        assert_eq!(items[0].rating, Some(8.5));
        assert_eq!(items[0].reviews, Some(1204));
        assert_eq!(items[0].price.as_deref(), Some("US$120"));

        assert_eq!(items[1].name, "Le Marais");
        assert_eq!(items[1].rating, None);
        assert_eq!(items[1].currency, "USD");
    }

    #[test]
    fn test_serializes_camel_case() {
        let item = ListItem {
            name: "A".to_string(),
            url: "https://a".to_string(),
            rating: None,
            reviews: None,
            price: None,
            location: None,
            currency: "EUR".to_string(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["currency"], "EUR");
        assert!(value.get("rating").is_some());
    }
}
