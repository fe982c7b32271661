//! Crawler module: the crawl orchestration core
//!
//! This module contains the core crawling logic, including:
//! - The request frontier with its retry policy and overflow bound
//! - Run-scoped entity deduplication
//! - Stage dispatch and pagination inference
//! - Detail page extraction
//! - HTTP fetching with sticky sessions and a rate ceiling
//! - Overall crawl coordination

mod coordinator;
mod dedup;
mod extract;
mod fetcher;
mod frontier;
mod pagination;
mod router;

pub use coordinator::{run_crawl, select_run, Coordinator, CoordinatorSettings, RunReport};
pub use dedup::{DedupIndex, EntityId};
pub use extract::{clean_price, extract, normalize_currency, ExtractedRecord, FieldAbsent};
pub use fetcher::{
    build_http_client, classify_status, Fetcher, FetcherSettings, HttpFetcher,
    RateLimiter, SessionContext,
};
pub use frontier::{EnqueueReport, FailureOutcome, Frontier};
pub use pagination::{page_count, page_url, plan_pages};
pub use router::{leaf_product_count, Enqueue, StageOutcome, StageRouter};
