use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for PTT Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which forum to crawl and which sub-forums of it
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Root of the forum; post hrefs are resolved against it
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Sub-forum identifiers, e.g. "KMT"
    #[serde(default)]
    pub subforums: Vec<String>,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            subforums: Vec::new(),
        }
    }
}

/// Request behaviour shared by every fetch
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-attempt request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Lower bound of the randomized sleep between attempts (milliseconds)
    #[serde(rename = "backoff-min-ms", default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Upper bound of the randomized sleep between attempts (milliseconds)
    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_min_ms: default_backoff_min_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            headers: BTreeMap::new(),
        }
    }
}

/// Fan-out and filtering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Concurrent index-page fetches
    #[serde(rename = "url-workers", default = "default_workers")]
    pub url_workers: u32,

    /// Concurrent post-page fetches
    #[serde(rename = "post-workers", default = "default_workers")]
    pub post_workers: u32,

    /// Shortest accepted body text, in characters
    #[serde(rename = "min-content-length", default = "default_min_content_length")]
    pub min_content_length: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            url_workers: default_workers(),
            post_workers: default_workers(),
            min_content_length: default_min_content_length(),
        }
    }
}

/// Where and how crawl results are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving CSV files and the user mapping
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Write `<subforum>_data.csv` files
    #[serde(default = "default_true")]
    pub csv: bool,

    /// Optional SQLite database receiving posts and comments
    #[serde(rename = "sqlite-path", default)]
    pub sqlite_path: Option<String>,

    /// Replace post authors and commenter ids with anonymous ids before writing
    #[serde(rename = "anonymise-authors", default = "default_true")]
    pub anonymise_authors: bool,

    /// One of hash, random_string, uuid, sequential, numeric
    #[serde(rename = "anonymise-method", default = "default_anonymise_method")]
    pub anonymise_method: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            csv: true,
            sqlite_path: None,
            anonymise_authors: true,
            anonymise_method: default_anonymise_method(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.ptt.cc/".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_min_ms() -> u64 {
    2000
}

fn default_backoff_max_ms() -> u64 {
    4000
}

fn default_workers() -> u32 {
    20
}

fn default_min_content_length() -> usize {
    10
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_anonymise_method() -> String {
    "hash".to_string()
}

fn default_true() -> bool {
    true
}
