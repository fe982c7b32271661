//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the trawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    site_table TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Run statistics counters (urls, items, totalItems, failed)
CREATE TABLE IF NOT EXISTS run_stats (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    key TEXT NOT NULL,
    value INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (run_id, key)
);

-- Extracted product records
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    item_id TEXT NOT NULL,
    payload TEXT NOT NULL,
    emitted_at TEXT NOT NULL
);

-- One row per product and run; a resumed run overwrites what it re-crawls
CREATE UNIQUE INDEX IF NOT EXISTS idx_records_run_item ON records(run_id, item_id);
CREATE INDEX IF NOT EXISTS idx_records_item ON records(item_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The SQLite connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
