//! Acceptance rules for extracted posts
//!
//! A rejected post is a normal filtering outcome, not an error: the reason is
//! logged and the post is left out of the result.

use crate::crawler::extractor::PostCandidate;
use std::fmt;

/// Title markers of announcements, news digests and reposts
pub const EXCLUDED_TITLE_KEYWORDS: [&str; 4] = ["公告", "新聞", "轉錄", "轉載"];

/// Body markers of reposted content
pub const REPOST_MARKERS: [&str; 2] = ["轉錄", "轉載"];

/// Default shortest accepted body, in characters
pub const MIN_CONTENT_LENGTH: usize = 10;

/// Why a candidate post was filtered out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingTitleOrTime,
    ExcludedTitle { keyword: &'static str },
    ContentTooShort { length: usize, minimum: usize },
    RepostContent { marker: &'static str },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitleOrTime => write!(f, "missing title or time"),
            Self::ExcludedTitle { keyword } => {
                write!(f, "title marks an announcement, news or repost ({})", keyword)
            }
            Self::ContentTooShort { length, minimum } => {
                write!(f, "content length {} below minimum {}", length, minimum)
            }
            Self::RepostContent { marker } => {
                write!(f, "content is, mentions or contains a repost ({})", marker)
            }
        }
    }
}

/// Applies the acceptance rules in order; the first failing rule rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentValidator {
    min_content_length: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(MIN_CONTENT_LENGTH)
    }
}

impl ContentValidator {
    pub fn new(min_content_length: usize) -> Self {
        Self { min_content_length }
    }

    /// Returns the first rule the candidate breaks, if any
    pub fn check(&self, candidate: &PostCandidate) -> Result<(), Rejection> {
        let title = match (&candidate.title, &candidate.time) {
            (Some(title), Some(_)) => title,
            _ => return Err(Rejection::MissingTitleOrTime),
        };

        if let Some(keyword) = find_any(title, &EXCLUDED_TITLE_KEYWORDS) {
            return Err(Rejection::ExcludedTitle { keyword });
        }

        let length = candidate.content.chars().count();
        if length < self.min_content_length {
            return Err(Rejection::ContentTooShort {
                length,
                minimum: self.min_content_length,
            });
        }

        if let Some(marker) = find_any(&candidate.content, &REPOST_MARKERS) {
            return Err(Rejection::RepostContent { marker });
        }

        Ok(())
    }

    /// Returns true if the candidate passes every rule, logging the reason otherwise
    pub fn validate(&self, candidate: &PostCandidate) -> bool {
        match self.check(candidate) {
            Ok(()) => true,
            Err(rejection) => {
                match rejection {
                    Rejection::MissingTitleOrTime | Rejection::ContentTooShort { .. } => {
                        tracing::warn!("Rejected {}: {}", candidate.url, rejection)
                    }
                    Rejection::ExcludedTitle { .. } | Rejection::RepostContent { .. } => {
                        tracing::debug!("Rejected {}: {}", candidate.url, rejection)
                    }
                }
                false
            }
        }
    }
}

fn find_any(text: &str, keywords: &[&'static str]) -> Option<&'static str> {
    keywords.iter().copied().find(|k| text.contains(k))
}
