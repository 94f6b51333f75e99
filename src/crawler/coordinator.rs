//! Crawler coordinator - main crawl orchestration logic
//!
//! A crawl runs as a straight line with two fan-out stages:
//!
//! ```text
//! discover ──▶ collect URLs (index pages 1..=N) ──join──▶ extract + validate (posts) ──join──▶ result
//! ```
//!
//! Each stage is a bounded pool of tokio tasks; the second stage starts only
//! after every task of the first has been joined.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::collector::collect_page_urls;
use crate::crawler::discovery::{discover, BoardUrls};
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::validator::ContentValidator;
use crate::record::{CrawlResult, PostRecord};
use crate::{CrawlError, HarvestError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Main crawler coordinator structure
///
/// Holds the immutable pieces shared by every worker: the fetcher (and through
/// it the HTTP client with its headers), the forum root and the validator.
#[derive(Debug, Clone)]
pub struct Coordinator {
    fetcher: PageFetcher,
    base_url: String,
    settings: CrawlerConfig,
    validator: ContentValidator,
}

impl Coordinator {
    /// Creates a coordinator from a loaded configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = PageFetcher::from_config(&config.http)?;
        Ok(Self::with_fetcher(
            fetcher,
            &config.forum.base_url,
            config.crawler.clone(),
        ))
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(fetcher: PageFetcher, base_url: &str, settings: CrawlerConfig) -> Self {
        let validator = ContentValidator::new(settings.min_content_length);
        Self {
            fetcher,
            base_url: base_url.to_string(),
            settings,
            validator,
        }
    }

    /// Crawls one sub-forum
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - At least one post passed extraction and validation
    /// * `Err(CrawlError)` - Discovery failed, or a fan-out stage came back empty
    pub async fn crawl(&self, subforum: &str) -> Result<CrawlResult, CrawlError> {
        let start_time = Instant::now();
        let board = BoardUrls::new(&self.base_url, subforum)?;

        tracing::info!("Discovering pagination of {} at {}", subforum, board.entry());
        let page_count = discover(&self.fetcher, board.entry()).await.map_err(|e| {
            tracing::warn!("{}. Exiting scraping of {}", e, subforum);
            e
        })?;

        tracing::info!(
            "{}: {} index pages, collecting post URLs",
            subforum,
            page_count
        );
        let urls = self
            .collect_urls(&board, page_count, self.settings.url_workers as usize)
            .await;
        if urls.is_empty() {
            tracing::warn!("No page URLs collected for {}", subforum);
            return Err(CrawlError::NoUrlsCollected);
        }

        tracing::info!("Initiating scraping of {} content pages", urls.len());
        let posts = self
            .extract_posts(urls, subforum, self.settings.post_workers as usize)
            .await;
        if posts.is_empty() {
            tracing::warn!("No data extracted for {}", subforum);
            return Err(CrawlError::NoDataExtracted);
        }

        tracing::info!(
            "{}: {} posts extracted in {:?}",
            subforum,
            posts.len(),
            start_time.elapsed()
        );
        Ok(CrawlResult::new(posts))
    }

    /// Collects post URLs from index pages `1..=page_count`
    ///
    /// Pages that fail to load contribute nothing. The order of the returned
    /// URLs follows task completion, not page numbers.
    pub async fn collect_urls(
        &self,
        board: &BoardUrls,
        page_count: u32,
        workers: usize,
    ) -> Vec<String> {
        let pages = run_bounded((1..=page_count).collect(), workers, |page| {
            let fetcher = self.fetcher.clone();
            let board = board.clone();
            async move { collect_page_urls(&fetcher, &board, page).await }
        })
        .await;

        let urls: Vec<String> = pages.into_iter().flatten().collect();
        tracing::debug!("Collected {} content page URLs", urls.len());
        urls
    }

    /// Fetches, extracts and validates every post URL
    pub async fn extract_posts(
        &self,
        urls: Vec<String>,
        subforum: &str,
        workers: usize,
    ) -> Vec<PostRecord> {
        let total = urls.len();
        let posts = run_bounded(urls, workers, |url| {
            let fetcher = self.fetcher.clone();
            let validator = self.validator;
            let subforum = subforum.to_string();
            async move { extract(&fetcher, &url, &subforum, &validator).await }
        })
        .await;

        tracing::debug!("{} of {} posts kept", posts.len(), total);
        posts
    }
}

/// Runs `task` over `items` with at most `workers` tasks in flight
///
/// Returns once every spawned task has finished; `None` outcomes and panicked
/// tasks are dropped.
async fn run_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, task: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Option<R>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set = JoinSet::new();

    for item in items {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let work = task(item);
        join_set.spawn(async move {
            let _permit = permit;
            work.await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => tracing::error!("Worker task failed: {}", e),
        }
    }
    results
}

/// Crawls one sub-forum with the given configuration
///
/// # Example
///
/// ```no_run
/// use ptt_harvest::config::load_config;
/// use ptt_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let result = run_crawl(&config, "KMT").await?;
/// println!("{} posts", result.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, subforum: &str) -> Result<CrawlResult, HarvestError> {
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.crawl(subforum).await?)
}
