//! OBI storefront adapter
//!
//! Selectors follow the markup OBI serves to non-JavaScript clients. The same
//! markup is used by every country storefront.

use crate::sites::{CategoryLink, ParseError, RawProduct, SiteAdapter};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e:?}"))
}

/// Pre-parsed selectors used by the adapter
struct Selectors {
    nav_category: Selector,
    nav_category_fallback: Selector,
    product_count: Selector,
    product_anchor: Selector,
    subcategory: Selector,
    variant: Selector,
    item_code: Selector,
    currency: Selector,
    struck_price: Selector,
    current_price: Selector,
    name: Selector,
    image_link: Selector,
    image_lazy: Selector,
    stock: Selector,
    breadcrumb: Selector,
    title: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    nav_category: selector(
        ".headr__nav-cat-col-inner > .headr__nav-cat-row > a.headr__nav-cat-link",
    ),
    nav_category_fallback: selector("ul.first-level > li > a"),
    product_count: selector(".variants[data-productcount]"),
    product_anchor: selector("li.product > a"),
    subcategory: selector(r#"a[wt_name="assortment_menu.level2"]"#),
    variant: selector(
        r#".selectboxes .selectbox li:not([class*="disabled"]) a[wt_name*="size_variant"],
           .selectboxes .selectbox li[data-ui-name="ads.variants.color.enabled"] a[wt_name*="color_variant"]"#,
    ),
    item_code: selector(r#"input[name="code"]"#),
    currency: selector(r#"meta[itemprop="priceCurrency"]"#),
    struck_price: selector(".buybox .saving + del"),
    current_price: selector(r#"[data-ui-name="ads.price.strong"]"#),
    name: selector(".overview__description > .overview__heading"),
    image_link: selector(".ads-slider__link"),
    image_lazy: selector(".ads-slider__image"),
    stock: selector("div.marg_b5"),
    breadcrumb: selector(r#"a[class*="normal"][wt_name*="breadcrumb.level"]"#),
    title: selector("title"),
});

/// Titles of the block and maintenance pages the storefront serves with 200
const ERROR_PAGE_TITLES: [&str; 3] = ["Access Denied", "Service Unavailable", "Wartungsarbeiten"];

/// Adapter for the OBI storefronts
#[derive(Debug, Clone, Copy, Default)]
pub struct ObiAdapter;

impl ObiAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

fn first_attr(doc: &Html, sel: &Selector, attr: &str) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|el| non_empty(el.value().attr(attr)))
}

fn hrefs(doc: &Html, sel: &Selector) -> Vec<String> {
    doc.select(sel)
        .filter_map(|el| non_empty(el.value().attr("href")))
        .collect()
}

impl SiteAdapter for ObiAdapter {
    type Document = Html;

    fn parse(&self, body: &[u8]) -> Result<Html, ParseError> {
        let html = String::from_utf8_lossy(body);
        if html.trim().is_empty() {
            return Err(ParseError("empty body".to_string()));
        }
        Ok(Html::parse_document(&html))
    }

    fn is_error_page(&self, doc: &Html) -> bool {
        first_text(doc, &SELECTORS.title)
            .map(|title| ERROR_PAGE_TITLES.iter().any(|t| title.contains(t)))
            .unwrap_or(false)
    }

    fn category_links(&self, doc: &Html) -> Vec<CategoryLink> {
        let primary: Vec<CategoryLink> = doc
            .select(&SELECTORS.nav_category)
            .filter_map(|a| {
                let href = non_empty(a.value().attr("href"))?;
                Some(CategoryLink {
                    href,
                    analytics_marker: non_empty(a.value().attr("data-webtrekk")),
                })
            })
            .collect();

        if !primary.is_empty() {
            return primary;
        }

        // Older storefront templates only carry the flat menu
        hrefs(doc, &SELECTORS.nav_category_fallback)
            .into_iter()
            .map(|href| CategoryLink {
                href,
                analytics_marker: None,
            })
            .collect()
    }

    fn declared_product_count(&self, doc: &Html) -> Option<String> {
        doc.select(&SELECTORS.product_count)
            .next()
            .and_then(|el| el.value().attr("data-productcount"))
            .map(str::to_string)
    }

    fn product_links(&self, doc: &Html) -> Vec<String> {
        doc.select(&SELECTORS.product_anchor)
            .filter(|a| non_empty(a.value().attr("data-ui-name")).is_some())
            .filter_map(|a| non_empty(a.value().attr("href")))
            .collect()
    }

    fn subcategory_links(&self, doc: &Html) -> Vec<String> {
        hrefs(doc, &SELECTORS.subcategory)
    }

    fn variant_links(&self, doc: &Html) -> Vec<String> {
        hrefs(doc, &SELECTORS.variant)
    }

    fn product(&self, doc: &Html) -> RawProduct {
        let img = first_attr(doc, &SELECTORS.image_link, "href")
            .or_else(|| first_attr(doc, &SELECTORS.image_lazy, "data-src"));

        let in_stock = doc
            .select(&SELECTORS.stock)
            .next()
            .map(|el| text_of(el).chars().any(|c| c.is_ascii_digit()))
            .unwrap_or(false);

        RawProduct {
            item_id: first_attr(doc, &SELECTORS.item_code, "value"),
            name: first_text(doc, &SELECTORS.name),
            currency: first_attr(doc, &SELECTORS.currency, "content"),
            current_price_text: first_text(doc, &SELECTORS.current_price),
            struck_price_text: first_text(doc, &SELECTORS.struck_price),
            in_stock,
            img,
            breadcrumbs: doc.select(&SELECTORS.breadcrumb).map(text_of).collect(),
        }
    }
}
