//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the trawler, including:
//! - SQLite database initialization and schema management
//! - Run tracking and resumption support
//! - Durable run statistics
//! - The emitted dataset

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{DatasetSink, StatsStore, Storage, StorageError, StorageResult};

use crate::crawler::ExtractedRecord;
use crate::output::RunStats;
use std::path::Path;
use std::sync::Arc;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub site_table: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Returns true if a run in this status is continued by the next start
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Running | Self::Interrupted)
    }
}

/// A storage backend bound to one run
///
/// This is the stats store and dataset sink the crawl engine writes through.
#[derive(Clone)]
pub struct RunScope {
    storage: Arc<dyn Storage>,
    run_id: i64,
}

impl RunScope {
    pub fn new(storage: Arc<dyn Storage>, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl StatsStore for RunScope {
    fn load(&self) -> StorageResult<RunStats> {
        self.storage.load_stats(self.run_id)
    }

    fn save(&self, stats: &RunStats) -> StorageResult<()> {
        self.storage.save_stats(self.run_id, stats)
    }
}

impl DatasetSink for RunScope {
    fn emit(&self, record: &ExtractedRecord) -> StorageResult<()> {
        self.storage.insert_record(self.run_id, record)
    }
}
