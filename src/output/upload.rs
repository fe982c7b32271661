//! Post-run dataset upload
//!
//! Once a non-development run completes, its records are pushed to the
//! warehouse import endpoint into the table named after the site variant.

use crate::config::UploadConfig;
use crate::crawler::ExtractedRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while uploading a dataset
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid upload endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination of a finished run's dataset
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads `records` into `table`
    async fn upload(&self, table: &str, records: &[ExtractedRecord]) -> Result<(), UploadError>;
}

/// Uploads records as a JSON array to `{endpoint}/{table}`
pub struct HttpUploader {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig, user_agent: &str) -> Result<Self, UploadError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| UploadError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(UploadError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(300))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
        })
    }

    /// Returns the import URL of `table`
    pub fn table_url(&self, table: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(table);
        }
        url
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, table: &str, records: &[ExtractedRecord]) -> Result<(), UploadError> {
        let mut request = self.client.post(self.table_url(table)).json(records);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Uploaded {} records to {}", records.len(), table);
        Ok(())
    }
}
