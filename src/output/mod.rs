//! Output module for run statistics and dataset delivery
//!
//! This module handles:
//! - Accumulating and persisting run statistics
//! - Printing the statistics of a run
//! - Uploading a finished run's dataset to the warehouse

pub mod stats;
mod upload;

pub use stats::{
    load_latest_summary, print_statistics, RunStats, RunSummary, StatsAccumulator, StatsKey,
};
pub use upload::{HttpUploader, UploadError, Uploader};
