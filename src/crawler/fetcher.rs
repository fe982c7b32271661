//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` port the coordinator fetches through
//! - A bounded pool of client sessions, each with its own cookie jar
//! - Sticky host sessions, retired after a transient failure
//! - Round-robin proxy rotation across new sessions
//! - A global requests-per-minute ceiling
//! - Error classification into transient and permanent failures

use crate::config::Config;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Per-request context handed to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Host key the session is pinned to
    pub host: String,

    /// Failed attempts of the request so far
    pub attempt: u32,
}

/// Fetches raw documents
///
/// Implementations classify every failure: transient errors are retried under
/// the request retry budget, permanent ones are not.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, session: &SessionContext) -> Result<Vec<u8>, FetchError>;

    /// Reports that a body fetched under `session` turned out to be a block page
    ///
    /// Such a page arrives with a success status, so only the caller can tell.
    fn report_blocked(&self, _url: &Url, _session: &SessionContext) {}
}

/// Client settings shared by every session
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_requests_per_minute: u32,
    pub session_pool_size: usize,
    /// Proxy URLs rotated across sessions; empty for direct connections
    pub proxies: Vec<String>,
}

impl FetcherSettings {
    /// Derives fetcher settings from the configuration
    ///
    /// Development runs connect directly, without proxies.
    pub fn from_config(config: &Config) -> Self {
        let proxies = if config.development {
            Vec::new()
        } else {
            config.proxy.groups.clone()
        };

        Self {
            user_agent: config.user_agent.header_value(),
            timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            max_requests_per_minute: config.crawler.max_requests_per_minute,
            session_pool_size: config.proxy.session_pool_size.max(1) as usize,
            proxies,
        }
    }
}

/// Builds an HTTP client for one session
///
/// Every client keeps its own cookie store, so cookies stay with the session.
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<Proxy>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }

    builder.build()
}

/// Maps a non-success status to a fetch error
///
/// | Status | Outcome |
/// |--------|---------|
/// | 2xx | success |
/// | 403, 429 | transient (blocked or throttled session) |
/// | other 4xx | permanent |
/// | 5xx | transient |
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let reason = format!("HTTP {}", status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
        || status.is_server_error()
    {
        Some(FetchError::Transient(reason))
    } else {
        Some(FetchError::Permanent(reason))
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::Permanent(e.to_string())
    } else if e.is_timeout() {
        FetchError::Transient("request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Transient(format!("connection failed: {}", e))
    } else {
        FetchError::Transient(e.to_string())
    }
}

/// Spaces requests evenly to stay under a requests-per-minute ceiling
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn per_minute(max_requests_per_minute: u32) -> Self {
        Self {
            interval: Duration::from_secs(60) / max_requests_per_minute.max(1),
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Waits for the next free request slot
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

struct Session {
    id: u64,
    client: Client,
}

#[derive(Default)]
struct SessionPool {
    by_host: HashMap<String, Arc<Session>>,
    next_id: u64,
    next_proxy: usize,
}

/// HTTP fetcher with a sticky session pool
pub struct HttpFetcher {
    settings: FetcherSettings,
    proxies: Vec<Proxy>,
    pool: Mutex<SessionPool>,
    limiter: RateLimiter,
}

impl HttpFetcher {
    /// Creates a fetcher
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Ready fetcher; sessions are created on first use
    /// * `Err(reqwest::Error)` - A proxy URL is invalid
    pub fn new(settings: FetcherSettings) -> Result<Self, reqwest::Error> {
        let proxies = settings
            .proxies
            .iter()
            .map(|p| Proxy::all(p.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            limiter: RateLimiter::per_minute(settings.max_requests_per_minute),
            proxies,
            pool: Mutex::new(SessionPool::default()),
            settings,
        })
    }

    fn pool(&self) -> MutexGuard<'_, SessionPool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session pinned to `host`, creating one if needed
    fn session_for(&self, host: &str) -> Result<Arc<Session>, FetchError> {
        let mut pool = self.pool();
        if let Some(session) = pool.by_host.get(host) {
            return Ok(Arc::clone(session));
        }

        // Full pool: evict the oldest session
        if pool.by_host.len() >= self.settings.session_pool_size {
            let oldest = pool
                .by_host
                .iter()
                .min_by_key(|(_, s)| s.id)
                .map(|(h, _)| h.clone());
            if let Some(oldest) = oldest {
                pool.by_host.remove(&oldest);
            }
        }

        let proxy = if self.proxies.is_empty() {
            None
        } else {
            let proxy = self.proxies[pool.next_proxy % self.proxies.len()].clone();
            pool.next_proxy = pool.next_proxy.wrapping_add(1);
            Some(proxy)
        };

        let client = build_http_client(&self.settings.user_agent, self.settings.timeout, proxy)
            .map_err(|e| FetchError::Permanent(format!("failed to build client: {}", e)))?;

        pool.next_id += 1;
        let session = Arc::new(Session {
            id: pool.next_id,
            client,
        });
        pool.by_host.insert(host.to_string(), Arc::clone(&session));
        tracing::debug!("Session {} assigned to {}", session.id, host);
        Ok(session)
    }

    /// Drops the session of `host` if it is still the one identified by `id`
    fn retire(&self, host: &str, id: u64) {
        let mut pool = self.pool();
        if pool.by_host.get(host).is_some_and(|s| s.id == id) {
            pool.by_host.remove(host);
            tracing::debug!("Session {} for {} retired", id, host);
        }
    }

    /// Drops whatever session is currently pinned to `host`
    fn retire_host(&self, host: &str) {
        if let Some(session) = self.pool().by_host.remove(host) {
            tracing::debug!("Session {} for {} retired after a block page", session.id, host);
        }
    }

    async fn get(client: &Client, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, session: &SessionContext) -> Result<Vec<u8>, FetchError> {
        self.limiter.acquire().await;

        let pinned = self.session_for(&session.host)?;
        let result = Self::get(&pinned.client, url).await;

        if let Err(FetchError::Transient(reason)) = &result {
            tracing::debug!(
                "Transient failure for {} (attempt {}): {}",
                url,
                session.attempt + 1,
                reason
            );
            self.retire(&session.host, pinned.id);
        }
        result
    }

    fn report_blocked(&self, url: &Url, session: &SessionContext) {
        tracing::debug!("Block page served for {} (attempt {})", url, session.attempt + 1);
        self.retire_host(&session.host);
    }
}
