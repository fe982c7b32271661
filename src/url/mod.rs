//! URL handling module for Catalog-Trawler
//!
//! This module provides dedup-key normalization, host keys for session
//! affinity, link resolution and item ID parsing.

mod host;
mod normalize;

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Re-export main functions
pub use host::host_key;
pub use normalize::normalize_url;

/// Product detail URLs end in `p/<digits>`, optionally followed by `#/`
static RE_ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"p/(\d+)(?:#/)?$").expect("item id pattern is valid"));

/// Extracts the numeric item ID from a product detail URL
///
/// # Examples
///
/// ```
/// use catalog_trawler::url::item_id_from_url;
///
/// assert_eq!(item_id_from_url("https://www.obi.cz/vrtacky/aku-vrtacka/p/4018457"), Some("4018457"));
/// assert_eq!(item_id_from_url("https://www.obi.cz/vrtacky/aku-vrtacka/p/4018457#/"), Some("4018457"));
/// assert_eq!(item_id_from_url("https://www.obi.cz/vrtacky"), None);
/// ```
pub fn item_id_from_url(url: &str) -> Option<&str> {
    RE_ITEM_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None if the link should be excluded:
/// - empty and fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that do not resolve against `base`
/// - non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => Some(absolute),
        _ => None,
    }
}
