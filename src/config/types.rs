use serde::Deserialize;

/// Main configuration structure for Catalog-Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Development mode: no proxies, no upload, debug logging
    #[serde(default)]
    pub development: bool,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub upload: Option<UploadConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers pulling from the frontier
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// How many times a failed request is retried before it is counted as failed
    #[serde(rename = "max-request-retries", default = "default_max_request_retries")]
    pub max_request_retries: u32,

    /// Global request ceiling across all workers
    #[serde(
        rename = "max-requests-per-minute",
        default = "default_max_requests_per_minute"
    )]
    pub max_requests_per_minute: u32,

    /// Timeout for a single fetch (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on queued requests; `None` leaves the frontier unbounded
    #[serde(rename = "max-frontier-size", default)]
    pub max_frontier_size: Option<usize>,

    /// Number of finished requests between statistics checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_max_request_retries() -> u32 {
    3
}

fn default_max_requests_per_minute() -> u32 {
    600
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_checkpoint_interval() -> u64 {
    50
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_request_retries: default_max_request_retries(),
            max_requests_per_minute: default_max_requests_per_minute(),
            request_timeout_secs: default_request_timeout_secs(),
            max_frontier_size: None,
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// Site-variant selector
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site adapter name (e.g., "obi")
    pub name: String,

    /// Country storefront of the site (e.g., "cz")
    #[serde(default = "default_country")]
    pub country: String,

    /// Overrides the home page derived from the site variant
    #[serde(rename = "home-url", default)]
    pub home_url: Option<String>,
}

fn default_country() -> String {
    "cz".to_string()
}

/// Upstream proxy and session pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoints rotated across sessions
    #[serde(default)]
    pub groups: Vec<String>,

    /// Maximum number of concurrent client sessions
    #[serde(rename = "session-pool-size", default = "default_session_pool_size")]
    pub session_pool_size: u32,
}

fn default_session_pool_size() -> u32 {
    150
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            session_pool_size: default_session_pool_size(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding runs, statistics and records
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Post-run warehouse upload configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the import endpoint; the table name is appended as a path segment
    pub endpoint: String,

    /// Optional bearer token
    #[serde(default)]
    pub token: Option<String>,
}
