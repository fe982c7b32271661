//! Run statistics
//!
//! Four counters describe a run: discovered URLs, emitted items, visited detail
//! pages and terminally failed requests. They only grow, and they survive a
//! restart: the accumulator is seeded from the store, continued in memory and
//! written back at checkpoints.

use crate::storage::{RunRecord, StatsStore, Storage, StorageResult};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A run statistics counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKey {
    /// Requests handed to the frontier by stage handlers
    Urls,

    /// Records emitted to the dataset
    Items,

    /// Detail pages handled, with or without a record
    TotalItems,

    /// Requests that exhausted their retries
    Failed,
}

impl StatsKey {
    /// Returns the key as stored in the database
    pub fn db_key(&self) -> &'static str {
        match self {
            Self::Urls => "urls",
            Self::Items => "items",
            Self::TotalItems => "totalItems",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_key(s: &str) -> Option<Self> {
        match s {
            "urls" => Some(Self::Urls),
            "items" => Some(Self::Items),
            "totalItems" => Some(Self::TotalItems),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Urls, Self::Items, Self::TotalItems, Self::Failed]
    }

    fn index(&self) -> usize {
        match self {
            Self::Urls => 0,
            Self::Items => 1,
            Self::TotalItems => 2,
            Self::Failed => 3,
        }
    }
}

/// A snapshot of the run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub urls: u64,
    pub items: u64,
    pub total_items: u64,
    pub failed: u64,
}

impl RunStats {
    pub fn get(&self, key: StatsKey) -> u64 {
        match key {
            StatsKey::Urls => self.urls,
            StatsKey::Items => self.items,
            StatsKey::TotalItems => self.total_items,
            StatsKey::Failed => self.failed,
        }
    }

    pub fn set(&mut self, key: StatsKey, value: u64) {
        match key {
            StatsKey::Urls => self.urls = value,
            StatsKey::Items => self.items = value,
            StatsKey::TotalItems => self.total_items = value,
            StatsKey::Failed => self.failed = value,
        }
    }
}

/// Concurrent run counters backed by a durable store
pub struct StatsAccumulator {
    counters: [AtomicU64; 4],
    store: Arc<dyn StatsStore>,
}

impl StatsAccumulator {
    /// Creates an accumulator continuing from the counters persisted in `store`
    pub fn load(store: Arc<dyn StatsStore>) -> StorageResult<Self> {
        let persisted = store.load()?;
        let counters = StatsKey::all().map(|key| AtomicU64::new(persisted.get(key)));
        Ok(Self { counters, store })
    }

    /// Adds `n` to a counter
    pub fn add(&self, key: StatsKey, n: u64) {
        self.counters[key.index()].fetch_add(n, Ordering::Relaxed);
    }

    /// Adds one to a counter
    pub fn inc(&self, key: StatsKey) {
        self.add(key, 1);
    }

    pub fn get(&self, key: StatsKey) -> u64 {
        self.counters[key.index()].load(Ordering::Relaxed)
    }

    /// Current values of all counters
    pub fn snapshot(&self) -> RunStats {
        let mut stats = RunStats::default();
        for key in StatsKey::all() {
            stats.set(key, self.get(key));
        }
        stats
    }

    /// Writes the current counters to the store
    pub fn save(&self) -> StorageResult<()> {
        self.store.save(&self.snapshot())
    }
}

/// A run with its persisted counters
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run: RunRecord,
    pub stats: RunStats,
    pub records: u64,
    pub duration_seconds: Option<u64>,
}

/// Loads the summary of the most recent run
///
/// # Returns
///
/// * `Ok(Some(RunSummary))` - The latest run and its counters
/// * `Ok(None)` - The database holds no run yet
pub fn load_latest_summary(storage: &dyn Storage) -> StorageResult<Option<RunSummary>> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };

    let duration_seconds = match (
        run.started_at.parse::<chrono::DateTime<chrono::Utc>>(),
        run.finished_at
            .as_deref()
            .map(str::parse::<chrono::DateTime<chrono::Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    Ok(Some(RunSummary {
        stats: storage.load_stats(run.id)?,
        records: storage.count_records(run.id)?,
        duration_seconds,
        run,
    }))
}

/// Prints run statistics to stdout in a formatted manner
pub fn print_statistics(summary: &RunSummary) {
    println!("=== Run Statistics ===\n");

    println!("Run:");
    println!("  ID: {}", summary.run.id);
    println!("  Table: {}", summary.run.site_table);
    println!("  Status: {}", summary.run.status.to_db_string());
    println!("  Started: {}", summary.run.started_at);
    if let Some(finished) = &summary.run.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(seconds) = summary.duration_seconds {
        println!("  Duration: {}s", seconds);
    }
    println!();

    let stats = &summary.stats;
    println!("Counters:");
    println!("  URLs enqueued: {}", stats.urls);
    println!("  Detail pages: {}", stats.total_items);
    println!("  Items emitted: {}", stats.items);
    println!("  Failed requests: {}", stats.failed);
    println!("  Records stored: {}", summary.records);
    println!();

    let yield_rate = if stats.total_items > 0 {
        (stats.items as f64 / stats.total_items as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Extraction Rate: {:.1}% ({} / {} detail pages produced a record)",
        yield_rate, stats.items, stats.total_items
    );
}
