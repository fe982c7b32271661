//! Stage dispatch
//!
//! The router turns a fetched page into follow-up requests and at most one
//! record. It owns no queue: its outcome is applied by the coordinator, which
//! keeps `urls` accounting next to the actual enqueue calls.

use crate::crawler::dedup::{DedupIndex, EntityId};
use crate::crawler::extract::{extract, ExtractedRecord};
use crate::crawler::pagination::plan_pages;
use crate::sites::SiteAdapter;
use crate::state::{Request, StageLabel};
use crate::url::{item_id_from_url, resolve_link};
use crate::FetchError;
use std::sync::Arc;
use url::Url;

/// A batch of requests to enqueue together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueue {
    pub requests: Vec<Request>,
    pub forefront: bool,
}

/// Everything a handled page produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutcome {
    /// Batches in the order they are to be enqueued
    pub enqueues: Vec<Enqueue>,

    /// The product record of a detail page, if its required fields resolved
    pub record: Option<ExtractedRecord>,

    /// Set for every handled detail page, with or without a record
    pub detail_visited: bool,
}

impl StageOutcome {
    /// Total number of requests across all batches
    pub fn request_count(&self) -> usize {
        self.enqueues.iter().map(|e| e.requests.len()).sum()
    }

    fn push(&mut self, from: &Request, requests: Vec<Request>, forefront: bool) {
        debug_assert!(requests.iter().all(|r| from.stage().may_enqueue(r.stage())));
        self.enqueues.push(Enqueue {
            requests,
            forefront,
        });
    }
}

/// Parses the declared product count of a category page
///
/// Whitespace is stripped and leading digits are read; anything after them is
/// ignored. A count of zero is treated like an absent one, so such a category is
/// crawled as an intermediate category.
pub fn leaf_product_count(raw: &str) -> Option<u64> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse::<u64>().ok().filter(|count| *count > 0)
}

/// Dispatches fetched pages to their stage handler
pub struct StageRouter<A: SiteAdapter> {
    adapter: Arc<A>,

    /// Run-scoped index of processed product URLs and item IDs
    processed: Arc<DedupIndex>,

    /// Category links are resolved against the home page
    home_url: Url,
}

impl<A: SiteAdapter> StageRouter<A> {
    pub fn new(adapter: Arc<A>, processed: Arc<DedupIndex>, home_url: Url) -> Self {
        Self {
            adapter,
            processed,
            home_url,
        }
    }

    /// Handles the fetched body of `request`
    ///
    /// # Returns
    ///
    /// * `Ok(StageOutcome)` - The page was handled; an unparsable page yields an
    ///   empty outcome
    /// * `Err(FetchError::Transient)` - The body is the site's error page
    pub fn process(&self, request: &Request, body: &[u8]) -> Result<StageOutcome, FetchError> {
        let doc = match self.adapter.parse(body) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", request.url(), e);
                return Ok(StageOutcome {
                    detail_visited: request.stage() == StageLabel::Detail,
                    ..StageOutcome::default()
                });
            }
        };

        if self.adapter.is_error_page(&doc) {
            return Err(FetchError::Transient(format!(
                "error page served for {}",
                request.url()
            )));
        }

        Ok(self.handle(request, &doc))
    }

    fn handle(&self, request: &Request, doc: &A::Document) -> StageOutcome {
        let mut outcome = StageOutcome::default();

        match request.stage() {
            StageLabel::Start => {
                let categories = self.start_requests(doc);
                outcome.push(request, categories, true);
            }
            StageLabel::SubCategory => {
                let declared = self.adapter.declared_product_count(doc);
                match declared.as_deref().and_then(leaf_product_count) {
                    Some(total) => {
                        let products = self.adapter.product_links(doc);
                        let pages = plan_pages(total, products.len(), request.url());
                        tracing::debug!(
                            "Leaf category {}: {} products, {} more pages",
                            request.url(),
                            total,
                            pages.len()
                        );
                        outcome.push(request, pages, true);
                        let details = self.detail_requests(request.url(), products);
                        outcome.push(request, details, false);
                    }
                    None => {
                        let children = self.subcategory_requests(doc);
                        outcome.push(request, children, true);
                    }
                }
            }
            StageLabel::Listing => {
                let details = self.detail_requests(request.url(), self.adapter.product_links(doc));
                outcome.push(request, details, false);
            }
            StageLabel::Detail => {
                outcome.detail_visited = true;
                let variants = self.variant_requests(request.url(), doc);
                outcome.push(request, variants, false);

                match extract(&self.adapter.product(doc), request.url()) {
                    Ok(record) => outcome.record = Some(record),
                    Err(absent) => tracing::info!("No record for {}: {}", request.url(), absent),
                }
            }
        }

        outcome
    }

    fn start_requests(&self, doc: &A::Document) -> Vec<Request> {
        self.adapter
            .category_links(doc)
            .into_iter()
            .filter(|link| link.analytics_marker.is_none())
            .filter_map(|link| resolve_link(&link.href, &self.home_url))
            .filter_map(|url| labeled(url, StageLabel::SubCategory))
            .collect()
    }

    fn subcategory_requests(&self, doc: &A::Document) -> Vec<Request> {
        self.adapter
            .subcategory_links(doc)
            .iter()
            .filter_map(|href| resolve_link(href, &self.home_url))
            .filter_map(|url| labeled(url, StageLabel::SubCategory))
            .collect()
    }

    /// Product URLs not processed earlier in the run
    fn detail_requests(&self, page_url: &Url, hrefs: Vec<String>) -> Vec<Request> {
        hrefs
            .iter()
            .filter_map(|href| resolve_link(href, page_url))
            .filter(|url| {
                EntityId::from_url(url).is_some_and(|id| self.processed.insert(id))
            })
            .filter_map(|url| labeled(url, StageLabel::Detail))
            .collect()
    }

    /// Variant URLs whose item ID is neither the current one nor already known
    fn variant_requests(&self, page_url: &Url, doc: &A::Document) -> Vec<Request> {
        let current = item_id_from_url(page_url.as_str());
        if let Some(current) = current {
            self.processed.insert(EntityId::Item(current.to_string()));
        }

        self.adapter
            .variant_links(doc)
            .iter()
            .filter_map(|href| resolve_link(href, page_url))
            .filter(|url| match item_id_from_url(url.as_str()) {
                Some(id) if Some(id) == current => false,
                Some(id) => self.processed.insert(EntityId::Item(id.to_string())),
                None => false,
            })
            .filter_map(|url| labeled(url, StageLabel::Detail))
            .collect()
    }
}

fn labeled(url: Url, stage: StageLabel) -> Option<Request> {
    match Request::new(url, stage) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::debug!("Dropping link: {}", e);
            None
        }
    }
}
