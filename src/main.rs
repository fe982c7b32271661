//! Catalog-Trawler main entry point
//!
//! This is the command-line interface for the Catalog-Trawler product crawler.

use anyhow::Context;
use catalog_trawler::config::{load_config_with_hash, Config};
use catalog_trawler::crawler::run_crawl;
use catalog_trawler::output::{load_latest_summary, print_statistics};
use catalog_trawler::sites::resolve_variant;
use catalog_trawler::storage::open_storage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Trawler: a label-driven product catalog crawler
///
/// Catalog-Trawler walks a storefront from its home page through category,
/// listing and detail pages, and stores one normalized record per product.
#[derive(Parser, Debug)]
#[command(name = "catalog-trawler")]
#[command(version)]
#[command(about = "A label-driven product catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a new run instead of resuming an unfinished one
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal and reported before anything is crawled
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    setup_logging(cli.verbose, cli.quiet, config.development);
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber
///
/// Development runs log at debug level unless `-q` is given.
fn setup_logging(verbose: u8, quiet: bool, development: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        let level = verbose + u8::from(development && verbose == 0);
        match level {
            0 => EnvFilter::new("catalog_trawler=info,warn"),
            1 => EnvFilter::new("catalog_trawler=debug,info"),
            2 => EnvFilter::new("catalog_trawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let variant = resolve_variant(&config.site)?;

    println!("=== Catalog-Trawler Dry Run ===\n");

    println!("Site:");
    println!("  Variant: {}/{}", variant.name, variant.country);
    println!("  Home page: {}", variant.home_url);
    println!("  Upload table: {}", variant.table_name);

    println!("\nCrawler Configuration:");
    println!("  Development: {}", config.development);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Max request retries: {}", config.crawler.max_request_retries);
    println!(
        "  Max requests per minute: {}",
        config.crawler.max_requests_per_minute
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    match config.crawler.max_frontier_size {
        Some(max) => println!("  Max frontier size: {}", max),
        None => println!("  Max frontier size: unbounded"),
    }
    println!(
        "  Checkpoint interval: {} requests",
        config.crawler.checkpoint_interval
    );

    println!("\nSessions:");
    println!("  Pool size: {}", config.proxy.session_pool_size);
    if config.development || config.proxy.groups.is_empty() {
        println!("  Proxies: none (direct connections)");
    } else {
        println!("  Proxies ({}):", config.proxy.groups.len());
        for proxy in &config.proxy.groups {
            println!("    - {}", proxy);
        }
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match (&config.upload, config.development) {
        (_, true) => println!("  Upload: disabled (development)"),
        (Some(upload), false) => println!("  Upload: {}", upload.endpoint),
        (None, false) => println!("  Upload: not configured"),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", variant.home_url);

    Ok(())
}

/// Handles the --stats mode: shows statistics of the latest run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    match load_latest_summary(&storage)? {
        Some(summary) => print_statistics(&summary),
        None => println!("No runs recorded yet"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting a new run (ignoring unfinished runs)");
    } else {
        tracing::info!("Starting crawl (will resume an unfinished run)");
    }

    match run_crawl(config, config_hash, fresh).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed: {} items from {} detail pages, {} failed requests",
                report.stats.items,
                report.stats.total_items,
                report.stats.failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
