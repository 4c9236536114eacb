//! Detail records built from JSON-LD

use crate::config::SessionInput;
use crate::extract::{DetailExtractor, PageSnapshot};
use crate::SweepError;
use serde_json::{json, Value};

const STRUCTURED_DATA_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Parses the first JSON-LD block of the page
///
/// Returns `None` when the page has no such block or it is not valid JSON.
pub fn structured_data(page: &PageSnapshot) -> Option<Value> {
    let script = page.select_first(STRUCTURED_DATA_SELECTOR).ok()??;
    match serde_json::from_str(script.text()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Unparseable structured data on {}: {}", page.url(), e);
            None
        }
    }
}

/// `aggregateRating.ratingValue` as a number
///
/// Sites emit the value either as a JSON number or as a numeric string, with
/// a decimal point or a decimal comma.
pub fn aggregate_rating(structured: &Value) -> Option<f64> {
    match structured.get("aggregateRating")?.get("ratingValue")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn text_field(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Builds detail records from the page's JSON-LD plus a few page elements
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLdDetailExtractor;

impl JsonLdDetailExtractor {
    fn room_types(page: &PageSnapshot) -> Vec<String> {
        page.select(".hprt-roomtype-icon-link")
            .unwrap_or_default()
            .iter()
            .map(|room| room.text().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl DetailExtractor for JsonLdDetailExtractor {
    fn extract(
        &self,
        page: &PageSnapshot,
        structured: &Value,
        input: &SessionInput,
        order: Option<u32>,
    ) -> Result<Value, SweepError> {
        let name = text_field(structured, &["name"]).ok_or_else(|| SweepError::Extraction {
            url: page.url().to_string(),
            message: "structured data has no name".to_string(),
        })?;

        let address = json!({
            "full": text_field(structured, &["address", "streetAddress"]),
            "postalCode": text_field(structured, &["address", "postalCode"]),
            "region": text_field(structured, &["address", "addressRegion"]),
            "country": text_field(structured, &["address", "addressCountry"]),
        });

        Ok(json!({
            "order": order,
            "url": page.url(),
            "name": name,
            "type": text_field(structured, &["@type"]),
            "description": text_field(structured, &["description"]),
            "rating": aggregate_rating(structured),
            "reviews": structured
                .get("aggregateRating")
                .and_then(|rating| rating.get("reviewCount"))
                .and_then(|count| count.as_u64().or_else(|| count.as_str()?.parse().ok())),
            "priceRange": text_field(structured, &["priceRange"]),
            "image": text_field(structured, &["image"]),
            "address": address,
            "currency": input.currency,
            "rooms": Self::room_types(page),
        }))
    }
}
