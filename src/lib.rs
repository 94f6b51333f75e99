//! PTT Harvest: a sub-forum crawler for PTT-style bulletin boards
//!
//! This crate discovers every index page of a sub-forum, fetches each post page,
//! and parses it into typed post and comment records, tolerating transient network
//! failures and filtering out announcements, news digests and reposts.

pub mod anonymise;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for PTT Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl aborted: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Anonymisation error: {0}")]
    Anonymise(#[from] AnonymiseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid HTTP header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Failure of a single page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered 404; never retried
    #[error("404 Not Found for {url}")]
    NotFound { url: String },

    /// Timeouts, connection errors and non-404 statuses, after the retry budget ran out
    #[error("Failed to fetch {url} after {attempts} attempts: {message}")]
    Transient {
        url: String,
        attempts: u32,
        message: String,
    },

    /// The response arrived but its body could not be read as a document
    #[error("Malformed response body from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl FetchError {
    /// Returns true if the failure must not be retried
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The URL the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url } | Self::Transient { url, .. } | Self::Malformed { url, .. } => url,
        }
    }
}

/// Errors that make the page count of a sub-forum unknowable
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Entry page unavailable: {0}")]
    Fetch(#[from] FetchError),

    #[error("No '上頁' link found in the index page")]
    NavigationNotFound,

    #[error("The '上頁' text exists but not the associated link")]
    NavigationLinkMissing,

    #[error("Cannot find the page count in '{href}'")]
    PageCountUnparseable { href: String },

    #[error("Page count '{value}' is not a positive integer")]
    InvalidPageCount { value: String },
}

/// Crawl-level failures; each one means no result at all
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Pagination discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("No post URLs collected from any index page")]
    NoUrlsCollected,

    #[error("No post passed extraction and validation")]
    NoDataExtracted,

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },
}

/// Errors raised while writing crawl results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode comments: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Errors raised by the author anonymiser
#[derive(Debug, Error)]
pub enum AnonymiseError {
    #[error("Unknown anonymisation method: {0}")]
    UnknownMethod(String),

    #[error("Failed to access mapping file: {0}")]
    MappingIo(#[from] std::io::Error),

    #[error("Malformed mapping file at line {line}: {message}")]
    MappingFormat { line: usize, message: String },
}

/// Result type alias for PTT Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for single-page fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use record::{CommentRecord, CrawlResult, PostRecord};
