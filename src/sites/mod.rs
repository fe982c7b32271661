//! Site adapters
//!
//! The crawl engine never touches selectors. Every site-specific lookup goes
//! through a [`SiteAdapter`], which turns fetched bytes into a queryable document
//! and answers the handful of questions the stage router asks of it.
//!
//! # Components
//!
//! - `SiteAdapter`: the port the router drives
//! - `SiteVariant`: a resolved storefront (home page and upload table)
//! - `ObiAdapter`: the OBI storefront adapter

mod obi;

pub use obi::ObiAdapter;

use crate::config::SiteConfig;
use crate::{ConfigError, ConfigResult};
use thiserror::Error;
use url::Url;

/// A fetched body could not be turned into a document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to parse document: {0}")]
pub struct ParseError(pub String);

/// A navigation link on the home page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    /// Raw `href` attribute, possibly relative
    pub href: String,

    /// Analytics tracking marker; links carrying one are not real categories
    pub analytics_marker: Option<String>,
}

/// Product fields as found on a detail page, before normalization
///
/// Every lookup is independent: a missing field leaves the others intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProduct {
    pub item_id: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub current_price_text: Option<String>,
    /// Struck-through price text; present only on discounted products
    pub struck_price_text: Option<String>,
    pub in_stock: bool,
    /// Image reference, possibly protocol-relative
    pub img: Option<String>,
    pub breadcrumbs: Vec<String>,
}

/// Site-specific page queries
///
/// Parsing and every query run synchronously inside one handler; the document
/// is never held across a fetch, so it does not need to be `Send`.
pub trait SiteAdapter: Send + Sync {
    /// Queryable page representation
    type Document;

    /// Parses a fetched body
    fn parse(&self, body: &[u8]) -> Result<Self::Document, ParseError>;

    /// Returns true if the document is the site's error page rather than content
    fn is_error_page(&self, _doc: &Self::Document) -> bool {
        false
    }

    /// Category navigation links of the home page
    fn category_links(&self, doc: &Self::Document) -> Vec<CategoryLink>;

    /// Raw declared product count of a category page, if the page declares one
    fn declared_product_count(&self, doc: &Self::Document) -> Option<String>;

    /// Raw hrefs of the product anchors shown on a listing page
    fn product_links(&self, doc: &Self::Document) -> Vec<String>;

    /// Raw hrefs of child category links on an intermediate category page
    fn subcategory_links(&self, doc: &Self::Document) -> Vec<String>;

    /// Raw hrefs of selectable variants on a detail page
    fn variant_links(&self, doc: &Self::Document) -> Vec<String>;

    /// Product fields of a detail page
    fn product(&self, doc: &Self::Document) -> RawProduct;
}

/// A resolved storefront of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteVariant {
    pub name: String,
    pub country: String,
    /// Seed URL of the crawl
    pub home_url: Url,
    /// Warehouse table the run's dataset is uploaded to
    pub table_name: String,
}

/// Country storefronts of OBI
pub const OBI_COUNTRIES: [&str; 8] = ["cz", "sk", "hu", "pl", "de", "at", "ch", "it"];

/// Resolves the configured site variant
///
/// # Returns
///
/// * `Ok(SiteVariant)` - A known site and country
/// * `Err(ConfigError::UnknownSiteVariant)` - The site or country is not supported
/// * `Err(ConfigError::InvalidUrl)` - The home page override is not a valid URL
pub fn resolve_variant(site: &SiteConfig) -> ConfigResult<SiteVariant> {
    let name = site.name.trim().to_ascii_lowercase();
    let country = site.country.trim().to_ascii_lowercase();

    if name != "obi" || !OBI_COUNTRIES.contains(&country.as_str()) {
        return Err(ConfigError::UnknownSiteVariant {
            site: site.name.clone(),
            country: site.country.clone(),
            supported: OBI_COUNTRIES
                .iter()
                .map(|cc| format!("obi/{}", cc))
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    // Italy runs on its own domain
    let brand = if country == "it" { "obi-italia" } else { "obi" };

    let home = match &site.home_url {
        Some(custom) => custom.clone(),
        None => format!("https://www.{}.{}", brand, country),
    };
    let home_url = Url::parse(&home)
        .map_err(|e| ConfigError::InvalidUrl(format!("home-url '{}': {}", home, e)))?;
    if !matches!(home_url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "home-url must be HTTP(S): {}",
            home
        )));
    }

    Ok(SiteVariant {
        table_name: format!("{}_{}", brand, country),
        name,
        country,
        home_url,
    })
}
