use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, ProxyConfig, UploadConfig, UserAgentConfig,
};
use crate::sites::resolve_variant;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    resolve_variant(&config.site)?;
    validate_proxy_config(&config.proxy)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(upload) = &config.upload {
        validate_upload_config(upload)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 200 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 200, got {}",
            config.max_concurrency
        )));
    }

    if config.max_requests_per_minute < 1 {
        return Err(ConfigError::Validation(
            "max-requests-per-minute must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint-interval must be >= 1".to_string(),
        ));
    }

    if let Some(max) = config.max_frontier_size {
        if max < config.max_concurrency as usize {
            return Err(ConfigError::Validation(format!(
                "max-frontier-size ({}) must be at least max-concurrency ({})",
                max, config.max_concurrency
            )));
        }
    }

    Ok(())
}

/// Validates proxy endpoints and session pool size
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.session_pool_size < 1 {
        return Err(ConfigError::Validation(
            "session-pool-size must be >= 1".to_string(),
        ));
    }

    for group in &config.groups {
        let url = Url::parse(group)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", group, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http or https",
                group
            )));
        }
        // Same check the fetcher runs when it builds its clients
        reqwest::Proxy::all(group.as_str())
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", group, e)))?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_upload_config(config: &UploadConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid upload endpoint: {}", e)))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "Upload endpoint '{}' cannot be a base URL",
            config.endpoint
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
