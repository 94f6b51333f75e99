//! Output handler traits and types
//!
//! This module defines the trait interface for output handlers. The crawler
//! hands its [`CrawlResult`] to handlers; it never persists anything itself.

use crate::record::CrawlResult;
use crate::OutputError;

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for sinks that receive crawl results
pub trait OutputHandler {
    /// Writes every post of `result`
    fn write(&mut self, result: &CrawlResult) -> OutputResult<()>;
}
