//! Fake ports shared by the engine tests

use async_trait::async_trait;
use catalog_trawler::crawler::{
    Coordinator, CoordinatorSettings, DedupIndex, ExtractedRecord, Fetcher, Frontier,
    SessionContext, StageRouter,
};
use catalog_trawler::output::StatsAccumulator;
use catalog_trawler::sites::{CategoryLink, ParseError, RawProduct, SiteAdapter};
use catalog_trawler::storage::{DatasetSink, RunScope, StatsStore, Storage, StorageResult};
use catalog_trawler::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

pub const HOME: &str = "https://shop.test/";

/// A page of the fake shop, served as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FakePage {
    pub categories: Vec<String>,
    pub analytics: Vec<String>,
    pub count: Option<String>,
    pub products: Vec<String>,
    pub subcategories: Vec<String>,
    pub variants: Vec<String>,
    pub item_id: Option<String>,
    pub currency: Option<String>,
    pub price: Option<String>,
    pub error_page: bool,
}

impl FakePage {
    pub fn product(id: &str, currency: Option<&str>) -> Self {
        Self {
            item_id: Some(id.to_string()),
            currency: currency.map(str::to_string),
            price: Some("1 299,-".to_string()),
            ..Self::default()
        }
    }
}

pub struct FakeAdapter;

impl SiteAdapter for FakeAdapter {
    type Document = FakePage;

    fn parse(&self, body: &[u8]) -> Result<FakePage, ParseError> {
        serde_json::from_slice(body).map_err(|e| ParseError(e.to_string()))
    }

    fn is_error_page(&self, doc: &FakePage) -> bool {
        doc.error_page
    }

    fn category_links(&self, doc: &FakePage) -> Vec<CategoryLink> {
        let plain = doc.categories.iter().map(|href| CategoryLink {
            href: href.clone(),
            analytics_marker: None,
        });
        let tracked = doc.analytics.iter().map(|href| CategoryLink {
            href: href.clone(),
            analytics_marker: Some("promo".to_string()),
        });
        plain.chain(tracked).collect()
    }

    fn declared_product_count(&self, doc: &FakePage) -> Option<String> {
        doc.count.clone()
    }

    fn product_links(&self, doc: &FakePage) -> Vec<String> {
        doc.products.clone()
    }

    fn subcategory_links(&self, doc: &FakePage) -> Vec<String> {
        doc.subcategories.clone()
    }

    fn variant_links(&self, doc: &FakePage) -> Vec<String> {
        doc.variants.clone()
    }

    fn product(&self, doc: &FakePage) -> RawProduct {
        RawProduct {
            item_id: doc.item_id.clone(),
            name: doc.item_id.as_ref().map(|id| format!("Product {}", id)),
            currency: doc.currency.clone(),
            current_price_text: doc.price.clone(),
            in_stock: true,
            ..RawProduct::default()
        }
    }
}

/// Serves fake pages by absolute URL and counts every fetch
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, FakePage>,
    failures: HashMap<String, (FetchError, u32)>,
    fetches: Mutex<HashMap<String, u32>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Fails the first `times` fetches of `url` with `error`
    pub fn failing(mut self, url: &str, error: FetchError, times: u32) -> Self {
        self.failures.insert(url.to_string(), (error, times));
        self
    }

    pub fn fetch_count(&self, url: &str) -> u32 {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> u32 {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url, _session: &SessionContext) -> Result<Vec<u8>, FetchError> {
        tokio::task::yield_now().await;

        let key = url.as_str().to_string();
        let count = {
            let mut fetches = self.fetches.lock().unwrap();
            let count = fetches.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if let Some((error, times)) = self.failures.get(&key) {
            if count <= *times {
                return Err(error.clone());
            }
        }

        match self.pages.get(&key) {
            Some(page) => Ok(serde_json::to_vec(page).unwrap()),
            None => Err(FetchError::Permanent(format!("HTTP 404 for {}", key))),
        }
    }
}

/// Collects emitted records in memory
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<ExtractedRecord>>,
}

impl DatasetSink for MemorySink {
    fn emit(&self, record: &ExtractedRecord) -> StorageResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct Harness {
    pub coordinator: Arc<Coordinator<FakeAdapter>>,
    pub fetcher: Arc<FakeFetcher>,
    pub sink: Arc<MemorySink>,
    pub stats: Arc<StatsAccumulator>,
}

/// Wires a coordinator over `adapter` and the given ports
pub fn wire<A: SiteAdapter + 'static>(
    adapter: A,
    home: &str,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn DatasetSink>,
    store: Arc<dyn StatsStore>,
    max_request_retries: u32,
    concurrency: usize,
) -> (Arc<Coordinator<A>>, Arc<StatsAccumulator>) {
    let stats = Arc::new(StatsAccumulator::load(store).unwrap());
    let router = StageRouter::new(
        Arc::new(adapter),
        Arc::new(DedupIndex::new()),
        Url::parse(home).unwrap(),
    );
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(Frontier::new(max_request_retries, None)),
        router,
        fetcher,
        sink,
        Arc::clone(&stats),
        CoordinatorSettings {
            concurrency,
            checkpoint_interval: 5,
        },
    ));
    (coordinator, stats)
}

/// Wires a coordinator over the fake ports, persisting stats through `store`
pub fn harness(
    fetcher: FakeFetcher,
    store: Arc<dyn StatsStore>,
    max_request_retries: u32,
    concurrency: usize,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let sink = Arc::new(MemorySink::default());
    let (coordinator, stats) = wire(
        FakeAdapter,
        HOME,
        Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        Arc::clone(&sink) as Arc<dyn DatasetSink>,
        store,
        max_request_retries,
        concurrency,
    );

    Harness {
        coordinator,
        fetcher,
        sink,
        stats,
    }
}

/// A stats store backed by a fresh in-memory database
pub fn memory_store() -> Arc<dyn StatsStore> {
    let storage: Arc<dyn Storage> =
        Arc::new(catalog_trawler::storage::SqliteStorage::new_in_memory().unwrap());
    let run_id = storage.create_run("test", "shop_test").unwrap();
    Arc::new(RunScope::new(storage, run_id))
}
