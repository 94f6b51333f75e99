//! Crawler module for sub-forum harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Pagination discovery from the entry page
//! - Post URL collection from index pages
//! - Post extraction and validation
//! - Overall crawl coordination

mod collector;
mod coordinator;
mod discovery;
mod extractor;
mod fetcher;
mod validator;

pub use collector::{collect_page_urls, extract_post_urls};
pub use coordinator::{run_crawl, Coordinator};
pub use discovery::{
    discover, find_previous_page_href, page_count_from_href, BoardUrls, PREVIOUS_PAGE_LABEL,
};
pub use extractor::{extract, extract_comments, extract_post, parse_post, MetaTag, PostCandidate};
pub use fetcher::{build_http_client, PageFetcher, RetryPolicy};
pub use validator::{
    ContentValidator, Rejection, EXCLUDED_TITLE_KEYWORDS, MIN_CONTENT_LENGTH, REPOST_MARKERS,
};
