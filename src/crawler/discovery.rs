//! Pagination discovery
//!
//! A sub-forum's entry page links to the previous index page through a
//! "wide button" labelled 上頁; the index number in that link is the number of
//! index pages to collect post URLs from.

use crate::crawler::fetcher::PageFetcher;
use crate::{CrawlError, DiscoveryError};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Label of the navigation button pointing at older index pages
pub const PREVIOUS_PAGE_LABEL: &str = "上頁";

/// URLs of one sub-forum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardUrls {
    base: Url,
    root: Url,
}

impl BoardUrls {
    /// Builds the URLs of `subforum` under the forum root `base_url`
    ///
    /// # Example
    ///
    /// ```
    /// use ptt_harvest::crawler::BoardUrls;
    ///
    /// let board = BoardUrls::new("https://www.ptt.cc/", "KMT").unwrap();
    /// assert_eq!(board.entry(), "https://www.ptt.cc/bbs/KMT/");
    /// assert_eq!(board.index_page(3), "https://www.ptt.cc/bbs/KMT/index3.html");
    /// ```
    pub fn new(base_url: &str, subforum: &str) -> Result<Self, CrawlError> {
        let invalid = |source| CrawlError::InvalidUrl {
            url: base_url.to_string(),
            source,
        };

        let mut base = Url::parse(base_url).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let root = base.join(&format!("bbs/{}/", subforum)).map_err(invalid)?;

        Ok(Self { base, root })
    }

    /// The forum root that post links are resolved against
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The sub-forum's entry page
    pub fn entry(&self) -> &str {
        self.root.as_str()
    }

    /// The index page numbered `page`
    pub fn index_page(&self, page: u32) -> String {
        format!("{}index{}.html", self.root, page)
    }
}

/// Fetches the entry page and derives the number of index pages
pub async fn discover(fetcher: &PageFetcher, entry_url: &str) -> Result<u32, DiscoveryError> {
    let body = fetcher.fetch(entry_url).await?;
    let href = find_previous_page_href(&body)?;
    let count = page_count_from_href(&href)?;
    tracing::debug!("{} has {} index pages", entry_url, count);
    Ok(count)
}

/// Finds the href of the first wide button labelled 上頁
pub fn find_previous_page_href(html: &str) -> Result<String, DiscoveryError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse("a.btn.wide").map_err(|_| DiscoveryError::NavigationNotFound)?;

    let button = document
        .select(&selector)
        .find(|a| a.text().collect::<String>().contains(PREVIOUS_PAGE_LABEL))
        .ok_or(DiscoveryError::NavigationNotFound)?;

    button
        .value()
        .attr("href")
        .map(str::to_string)
        .ok_or(DiscoveryError::NavigationLinkMissing)
}

/// Extracts `N` from an href ending in `indexN.html`
///
/// # Example
///
/// ```
/// use ptt_harvest::crawler::page_count_from_href;
///
/// assert_eq!(page_count_from_href("/bbs/KMT/index1234.html").unwrap(), 1234);
/// ```
pub fn page_count_from_href(href: &str) -> Result<u32, DiscoveryError> {
    let unparseable = || DiscoveryError::PageCountUnparseable {
        href: href.to_string(),
    };

    let pattern = Regex::new(r"index(\d+)\.html").map_err(|_| unparseable())?;
    let digits = pattern
        .captures(href)
        .and_then(|c| c.get(1))
        .ok_or_else(unparseable)?
        .as_str();

    match digits.parse::<u32>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(DiscoveryError::InvalidPageCount {
            value: digits.to_string(),
        }),
    }
}
