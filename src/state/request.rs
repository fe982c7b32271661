use crate::state::StageLabel;
use crate::url::normalize_url;
use crate::UrlResult;
use url::Url;

/// Queue position requested at enqueue time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Appended behind already queued work
    Normal,

    /// Served before everything already queued
    Forefront,
}

/// A unit of crawl work
///
/// A request is immutable once enqueued except for its attempt counter, which
/// only the frontier's retry policy advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    url: Url,
    unique_key: String,
    stage: StageLabel,
    priority: Priority,
    attempt: u32,
}

impl Request {
    /// Creates a request for `url`, deriving its dedup key
    ///
    /// # Returns
    ///
    /// * `Ok(Request)` - A fresh request with attempt 0
    /// * `Err(UrlError)` - The URL cannot be normalized (non-HTTP scheme, no host)
    pub fn new(url: Url, stage: StageLabel) -> UrlResult<Self> {
        let unique_key = normalize_url(url.as_str())?.to_string();
        Ok(Self {
            url,
            unique_key,
            stage,
            priority: Priority::Normal,
            attempt: 0,
        })
    }

    /// Parses `url` and creates a request for it
    pub fn parse(url: &str, stage: StageLabel) -> UrlResult<Self> {
        let parsed = Url::parse(url).map_err(|e| crate::UrlError::Parse(e.to_string()))?;
        Self::new(parsed, stage)
    }

    /// The URL to fetch
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The normalized URL identifying this request for dedup purposes
    pub fn unique_key(&self) -> &str {
        &self.unique_key
    }

    /// The stage handler this request is routed to
    pub fn stage(&self) -> StageLabel {
        self.stage
    }

    /// The priority the request was enqueued with
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Number of failed attempts so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub(crate) fn record_failed_attempt(&mut self) {
        self.attempt += 1;
    }
}
