//! Pagination inference for leaf category pages
//!
//! A leaf category declares how many products it holds and shows one page of
//! them. The remaining pages are addressed with a `page` query parameter.

use crate::state::{Request, StageLabel};
use url::Url;

/// Number of pages needed to show `total_items` at `per_page` items each
///
/// Returns 0 when nothing is observed on the page.
pub fn page_count(total_items: u64, per_page: usize) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(per_page as u64)
}

/// Builds the URL of page `page` of the category at `base`
///
/// The path gains a trailing slash and `page` replaces any existing page
/// parameter; other query parameters are kept.
///
/// # Examples
///
/// ```
/// use catalog_trawler::crawler::page_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.obi.cz/zahradni-nabytek").unwrap();
/// assert_eq!(page_url(&base, 2).as_str(), "https://www.obi.cz/zahradni-nabytek/?page=2");
/// ```
pub fn page_url(base: &Url, page: u64) -> Url {
    let mut url = base.clone();
    url.set_fragment(None);

    let path = format!("{}/", base.path().trim_end_matches('/'));
    url.set_path(&path);

    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());

    url
}

/// Plans the continuation requests of a leaf category
///
/// Returns `Listing` requests for pages `2..=page_count`; the first page is the
/// one being handled. Empty when `per_page` is 0 or a single page suffices.
pub fn plan_pages(total_items: u64, per_page: usize, base: &Url) -> Vec<Request> {
    let pages = page_count(total_items, per_page);
    if pages <= 1 {
        return Vec::new();
    }

    (2..=pages)
        .filter_map(|page| match Request::new(page_url(base, page), StageLabel::Listing) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::debug!("Skipping page {} of {}: {}", page, base, e);
                None
            }
        })
        .collect()
}
