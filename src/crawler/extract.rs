//! Detail page extraction
//!
//! Turns the raw fields a site adapter finds on a detail page into a normalized
//! [`ExtractedRecord`], or reports which required fields were absent.

use crate::sites::RawProduct;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A normalized product record
///
/// Every attribute is serialized; missing optional values become `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub item_url: String,
    pub item_id: String,
    pub item_name: String,
    pub currency: String,
    pub current_price: f64,
    pub discounted: bool,
    pub original_price: Option<f64>,
    pub in_stock: bool,
    pub img: Option<String>,
    pub category: String,
}

/// Required fields that did not resolve on a detail page
///
/// Not retried: the same page would yield the same absence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("required fields absent: {}", .0.join(", "))]
pub struct FieldAbsent(pub Vec<&'static str>);

/// Currencies replaced by the euro, mapped to their successor
const LEGACY_CURRENCIES: [(&str, &str); 5] = [
    ("SKK", "EUR"),
    ("LTL", "EUR"),
    ("LVL", "EUR"),
    ("EEK", "EUR"),
    ("HRK", "EUR"),
];

/// Maps a retired currency code to its successor; other codes pass through
pub fn normalize_currency(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    LEGACY_CURRENCIES
        .iter()
        .find(|(legacy, _)| *legacy == code)
        .map(|(_, successor)| successor.to_string())
        .unwrap_or(code)
}

/// Parses a locale-formatted price
///
/// Currency symbols, spaces and a trailing `,-` are dropped. The last `,` or
/// `.` is the decimal separator when one or two digits follow it; any other
/// separator groups thousands.
///
/// # Examples
///
/// ```
/// use catalog_trawler::crawler::clean_price;
///
/// assert_eq!(clean_price("1 999,-"), Some(1999.0));
/// assert_eq!(clean_price("1.299,90 €"), Some(1299.9));
/// assert_eq!(clean_price("zł 12,5"), Some(12.5));
/// assert_eq!(clean_price("1,299"), Some(1299.0));
/// assert_eq!(clean_price("n/a"), None);
/// ```
pub fn clean_price(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(",-").unwrap_or(trimmed);

    let kept: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let kept = kept.trim_matches(|c| c == ',' || c == '.');

    let normalized = match kept.rfind([',', '.']) {
        Some(pos) if (1..=2).contains(&(kept.len() - pos - 1)) => {
            let integer: String = kept[..pos].chars().filter(char::is_ascii_digit).collect();
            format!("{}.{}", integer, &kept[pos + 1..])
        }
        _ => kept.chars().filter(char::is_ascii_digit).collect(),
    };

    if normalized.is_empty() || normalized.starts_with('.') {
        return None;
    }
    normalized.parse().ok()
}

/// Builds a record from the raw fields of the detail page at `item_url`
///
/// Each field is looked up independently. Item ID, name, currency and a
/// parsable current price are required; all absent ones are reported together.
pub fn extract(raw: &RawProduct, item_url: &Url) -> Result<ExtractedRecord, FieldAbsent> {
    let mut absent = Vec::new();

    let item_id = raw.item_id.clone();
    if item_id.is_none() {
        absent.push("itemId");
    }
    let item_name = raw.name.clone();
    if item_name.is_none() {
        absent.push("itemName");
    }
    let currency = raw.currency.as_deref().map(normalize_currency);
    if currency.is_none() {
        absent.push("currency");
    }
    let current_price = raw.current_price_text.as_deref().and_then(clean_price);
    if current_price.is_none() {
        absent.push("currentPrice");
    }

    let (Some(item_id), Some(item_name), Some(currency), Some(current_price)) =
        (item_id, item_name, currency, current_price)
    else {
        return Err(FieldAbsent(absent));
    };

    // A struck-through price marks a discount even when it does not parse
    let discounted = raw.struck_price_text.is_some();
    let original_price = raw.struck_price_text.as_deref().and_then(clean_price);

    Ok(ExtractedRecord {
        item_url: item_url.to_string(),
        item_id,
        item_name,
        currency,
        current_price,
        discounted,
        original_price,
        in_stock: raw.in_stock,
        img: raw
            .img
            .as_deref()
            .and_then(|img| item_url.join(img).ok())
            .map(|img| img.to_string()),
        category: raw.breadcrumbs.join("/"),
    })
}
