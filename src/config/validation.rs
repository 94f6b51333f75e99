use crate::anonymise::AnonymiseMethod;
use crate::config::types::{Config, CrawlerConfig, ForumConfig, HttpConfig, OutputConfig};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_forum_config(&config.forum)?;
    validate_http_config(&config.http)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the forum root and sub-forum names
fn validate_forum_config(config: &ForumConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    for subforum in &config.subforums {
        validate_subforum_name(subforum)?;
    }

    Ok(())
}

/// Applies a command-line sub-forum list and checks that something is left to crawl
///
/// A non-empty `overrides` replaces `forum.subforums`. The config file may omit
/// the list only when overrides are given.
pub fn resolve_subforums(config: &mut Config, overrides: Vec<String>) -> Result<(), ConfigError> {
    if !overrides.is_empty() {
        for name in &overrides {
            validate_subforum_name(name)?;
        }
        config.forum.subforums = overrides;
    }

    if config.forum.subforums.is_empty() {
        return Err(ConfigError::Validation(
            "no sub-forums to crawl: set forum.subforums or pass --subforum".to_string(),
        ));
    }

    Ok(())
}

/// Sub-forum names become a URL path segment, so keep them to a safe alphabet
pub fn validate_subforum_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "sub-forum name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "sub-forum name must contain only ASCII letters, digits, '_' and '-', got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates timeouts, retry budget, backoff bounds and headers
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-min-ms ({}) must not exceed backoff-max-ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

/// Validates worker pool sizes
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.url_workers < 1 || config.url_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "url-workers must be between 1 and 100, got {}",
            config.url_workers
        )));
    }

    if config.post_workers < 1 || config.post_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "post-workers must be between 1 and 100, got {}",
            config.post_workers
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if matches!(config.sqlite_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "sqlite-path cannot be empty when set".to_string(),
        ));
    }

    config
        .anonymise_method
        .parse::<AnonymiseMethod>()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    Ok(())
}
