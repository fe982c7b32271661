//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends, the two ports
//! the crawl engine writes through, and associated error types.

use crate::crawler::ExtractedRecord;
use crate::output::RunStats;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations provide thread-safe access through `&self`; workers share
/// one backend.
pub trait Storage: Send + Sync {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `site_table` - Upload table of the crawled site variant
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&self, config_hash: &str, site_table: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&self, run_id: i64) -> StorageResult<()>;

    // ===== Statistics =====

    /// Loads the persisted counters of a run; absent counters are zero
    fn load_stats(&self, run_id: i64) -> StorageResult<RunStats>;

    /// Persists the counters of a run
    ///
    /// A stored counter never decreases: a lower value than the stored one is
    /// ignored.
    fn save_stats(&self, run_id: i64, stats: &RunStats) -> StorageResult<()>;

    // ===== Records =====

    /// Appends a record to the run's dataset
    fn insert_record(&self, run_id: i64, record: &ExtractedRecord) -> StorageResult<()>;

    /// Counts the records emitted by a run
    fn count_records(&self, run_id: i64) -> StorageResult<u64>;

    /// Gets the records of a run in emission order
    fn records_for_run(&self, run_id: i64) -> StorageResult<Vec<ExtractedRecord>>;
}

/// Durable home of the run statistics
pub trait StatsStore: Send + Sync {
    fn load(&self) -> StorageResult<RunStats>;

    fn save(&self, stats: &RunStats) -> StorageResult<()>;
}

/// Destination of extracted records
pub trait DatasetSink: Send + Sync {
    fn emit(&self, record: &ExtractedRecord) -> StorageResult<()>;
}
