//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that coordinates all aspects of the
//! crawling process, including:
//! - Initializing storage and resuming unfinished runs
//! - Pulling requests from the frontier with a bounded number of workers
//! - Fetching, dispatching to stage handlers and applying their outcome
//! - Failure accounting and statistics checkpoints
//! - Handling interrupts and the post-run upload

use crate::config::Config;
use crate::crawler::dedup::DedupIndex;
use crate::crawler::fetcher::{Fetcher, FetcherSettings, HttpFetcher, SessionContext};
use crate::crawler::frontier::{FailureOutcome, Frontier};
use crate::crawler::router::{StageOutcome, StageRouter};
use crate::output::{HttpUploader, RunStats, StatsAccumulator, StatsKey, Uploader};
use crate::sites::{resolve_variant, ObiAdapter, SiteAdapter, SiteVariant};
use crate::state::{Request, StageLabel};
use crate::storage::{open_storage, DatasetSink, RunScope, Storage};
use crate::url::host_key;
use crate::TrawlError;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Worker pool settings
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    /// Number of concurrent workers
    pub concurrency: usize,

    /// Finished requests between statistics checkpoints
    pub checkpoint_interval: u64,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.crawler.max_concurrency.max(1) as usize,
            checkpoint_interval: config.crawler.checkpoint_interval.max(1),
        }
    }
}

/// Outcome of a finished (or interrupted) crawl
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    /// Counters at the end of the run, including those carried over on resume
    pub stats: RunStats,

    /// Requests that reached a final outcome in this process
    pub handled: u64,

    pub elapsed: Duration,
}

/// Main crawler coordinator structure
///
/// One request is one unit of work: fetch, stage handling and enqueueing of
/// the follow-up requests happen before the frontier releases its slot.
pub struct Coordinator<A: SiteAdapter> {
    frontier: Arc<Frontier>,
    router: StageRouter<A>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn DatasetSink>,
    stats: Arc<StatsAccumulator>,
    settings: CoordinatorSettings,
    finished: AtomicU64,
    started: Instant,
}

impl<A: SiteAdapter + 'static> Coordinator<A> {
    /// Creates a coordinator over the given ports
    pub fn new(
        frontier: Arc<Frontier>,
        router: StageRouter<A>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn DatasetSink>,
        stats: Arc<StatsAccumulator>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            frontier,
            router,
            fetcher,
            sink,
            stats,
            settings,
            finished: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Crawls from `seeds` until the frontier is exhausted
    ///
    /// Seeds are not counted as discovered URLs. Statistics are saved at every
    /// checkpoint and once more at the end.
    pub async fn run(self: Arc<Self>, seeds: Vec<Request>) -> RunReport {
        self.frontier.enqueue(seeds, false);
        tracing::info!(
            "Starting {} workers with {} queued requests",
            self.settings.concurrency,
            self.frontier.len()
        );

        let mut workers = JoinSet::new();
        for id in 0..self.settings.concurrency {
            let this = Arc::clone(&self);
            workers.spawn(async move { this.worker(id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        self.save_stats();
        let report = self.report();
        tracing::info!(
            "Crawl finished: {} requests in {:?} (urls {}, items {}, totalItems {}, failed {})",
            report.handled,
            report.elapsed,
            report.stats.urls,
            report.stats.items,
            report.stats.total_items,
            report.stats.failed
        );
        report
    }

    /// Snapshot of the run so far
    pub fn report(&self) -> RunReport {
        RunReport {
            stats: self.stats.snapshot(),
            handled: self.frontier.handled(),
            elapsed: self.started.elapsed(),
        }
    }

    async fn worker(&self, id: usize) {
        tracing::debug!("Worker {} started", id);
        while let Some(request) = self.frontier.dequeue().await {
            self.handle(request).await;
            self.checkpoint();
        }
        tracing::debug!("Worker {} finished", id);
    }

    async fn handle(&self, request: Request) {
        tracing::info!("Processing {} [{}]", request.url(), request.stage());

        let session = SessionContext {
            host: host_key(request.url()).unwrap_or_default(),
            attempt: request.attempt(),
        };

        let result = match self.fetcher.fetch(request.url(), &session).await {
            Ok(body) => {
                let processed = self.router.process(&request, &body);
                if processed.is_err() {
                    // Block pages arrive as successful fetches; the session is burnt anyway
                    self.fetcher.report_blocked(request.url(), &session);
                }
                processed
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                // Follow-up work is queued before the slot is released
                self.apply(outcome);
                self.frontier.report_success(&request);
            }
            Err(e) => {
                let url = request.url().to_string();
                match self.frontier.report_failure(request, e.is_transient()) {
                    FailureOutcome::Retrying { attempt } => {
                        tracing::warn!("Attempt {} for {} failed, retrying: {}", attempt, url, e);
                    }
                    FailureOutcome::Exhausted(request) => {
                        tracing::error!(
                            "Request {} failed after {} attempts: {}",
                            url,
                            request.attempt(),
                            e
                        );
                        self.stats.inc(StatsKey::Failed);
                    }
                }
            }
        }
    }

    fn apply(&self, outcome: StageOutcome) {
        for batch in outcome.enqueues {
            if batch.requests.is_empty() {
                continue;
            }
            self.stats.add(StatsKey::Urls, batch.requests.len() as u64);
            let report = self.frontier.enqueue(batch.requests, batch.forefront);
            if report.dropped > 0 {
                tracing::warn!("Frontier full: {} requests dropped", report.dropped);
            }
        }

        if outcome.detail_visited {
            self.stats.inc(StatsKey::TotalItems);
        }

        if let Some(record) = outcome.record {
            match self.sink.emit(&record) {
                Ok(()) => self.stats.inc(StatsKey::Items),
                Err(e) => tracing::error!("Failed to store record {}: {}", record.item_id, e),
            }
        }
    }

    fn checkpoint(&self) {
        let finished = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        if finished % self.settings.checkpoint_interval != 0 {
            return;
        }

        self.save_stats();
        let rate = finished as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} requests processed, {} queued, {} in flight, {:.2} requests/sec",
            finished,
            self.frontier.len(),
            self.frontier.in_flight(),
            rate
        );
    }

    fn save_stats(&self) {
        if let Err(e) = self.stats.save() {
            tracing::error!("Failed to save run statistics: {}", e);
        }
    }
}

/// Picks the run to continue, or creates one
///
/// The latest run is resumed while it is unfinished, unless `fresh` is set.
pub fn select_run(
    storage: &dyn Storage,
    config_hash: &str,
    variant: &SiteVariant,
    fresh: bool,
) -> crate::Result<i64> {
    if !fresh {
        if let Some(latest) = storage.get_latest_run()? {
            if latest.status.is_resumable() && latest.site_table == variant.table_name {
                if latest.config_hash != config_hash {
                    tracing::warn!(
                        "Configuration changed since run {} started; resuming anyway",
                        latest.id
                    );
                }
                tracing::info!("Resuming unfinished run {}", latest.id);
                return Ok(latest.id);
            }
        }
    }

    let run_id = storage.create_run(config_hash, &variant.table_name)?;
    tracing::info!("Starting new run {}", run_id);
    Ok(run_id)
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resolve the site variant and build the HTTP clients
/// 2. Open storage and create or resume a run
/// 3. Reload the run statistics
/// 4. Crawl from the variant's home page
/// 5. Mark the run completed and upload the dataset outside development
///
/// An interrupt (Ctrl-C) saves the statistics and leaves the run resumable.
///
/// # Example
///
/// ```no_run
/// use catalog_trawler::config::load_config_with_hash;
/// use catalog_trawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("trawler.toml"))?;
/// let report = run_crawl(config, &hash, false).await?;
/// println!("{} items", report.stats.items);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: &str, fresh: bool) -> crate::Result<RunReport> {
    let variant = resolve_variant(&config.site)?;

    // Client setup fails before any run row exists
    let fetcher = HttpFetcher::new(FetcherSettings::from_config(&config))?;
    let uploader = match &config.upload {
        Some(upload) if !config.development => Some(HttpUploader::new(
            upload,
            &config.user_agent.header_value(),
        )?),
        _ => None,
    };

    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.output.database_path))?);
    let run_id = select_run(storage.as_ref(), config_hash, &variant, fresh)?;
    let scope = RunScope::new(Arc::clone(&storage), run_id);

    let stats = Arc::new(StatsAccumulator::load(Arc::new(scope.clone()))?);
    let router = StageRouter::new(
        Arc::new(ObiAdapter::new()),
        Arc::new(DedupIndex::new()),
        variant.home_url.clone(),
    );
    let frontier = Arc::new(Frontier::new(
        config.crawler.max_request_retries,
        config.crawler.max_frontier_size,
    ));

    let coordinator = Arc::new(Coordinator::new(
        frontier,
        router,
        Arc::new(fetcher),
        Arc::new(scope),
        Arc::clone(&stats),
        CoordinatorSettings::from_config(&config),
    ));

    let seed = Request::new(variant.home_url.clone(), StageLabel::Start)?;
    tracing::info!("Crawling {} into table {}", variant.home_url, variant.table_name);

    let report = tokio::select! {
        report = Arc::clone(&coordinator).run(vec![seed]) => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; saving statistics of run {}", run_id);
            if let Err(e) = stats.save() {
                tracing::error!("Failed to save run statistics: {}", e);
            }
            storage.update_run_status(run_id, crate::storage::RunStatus::Interrupted)?;
            return Ok(coordinator.report());
        }
    };

    storage.complete_run(run_id)?;

    if config.development {
        tracing::info!("Development run: skipping upload");
    } else if let Some(uploader) = &uploader {
        upload_dataset(storage.as_ref(), run_id, &variant.table_name, uploader).await;
    } else {
        tracing::warn!(
            "No [upload] section configured; dataset stays in {}",
            config.output.database_path
        );
    }

    Ok(report)
}

/// Uploads the run's records; a failure is reported and never fails the run
async fn upload_dataset(storage: &dyn Storage, run_id: i64, table: &str, uploader: &dyn Uploader) {
    let result = async {
        let records = storage.records_for_run(run_id)?;
        uploader.upload(table, &records).await?;
        Ok::<usize, TrawlError>(records.len())
    }
    .await;

    match result {
        Ok(count) => tracing::info!("Uploaded {} records to {}", count, table),
        Err(e) => tracing::error!("Upload to {} failed: {}", table, e),
    }
}
