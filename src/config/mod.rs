//! Configuration module for Catalog-Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The configuration is read once at start; any error here aborts the run before
//! a single request is made.
//!
//! # Example
//!
//! ```no_run
//! use catalog_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Retries per request: {}", config.crawler.max_request_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, ProxyConfig, SiteConfig, UploadConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
