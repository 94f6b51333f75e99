//! Post and comment records produced by a crawl
//!
//! Records are plain values: built once by the extractor, then only read.

use serde::Serialize;

/// A single push (comment) attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    /// Sentiment marker, e.g. "推", "噓" or "→"
    pub push_tag: Option<String>,

    /// Id of the commenting user
    pub userid: String,

    /// Comment text, with the leading ": " still attached as displayed
    pub content: Option<String>,

    /// IP and date string exactly as rendered
    pub ipdatetime: String,
}

/// One validated post of a sub-forum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub author: Option<String>,
    pub title: String,

    /// Display timestamp, kept unparsed
    pub time: String,

    /// Body text with metadata lines, pushes and signature decorations removed
    pub content: String,

    /// Source URL; the record's identity
    pub url: String,
    pub subforum: String,

    /// Comments in document order
    pub comments: Vec<CommentRecord>,
}

/// The posts gathered by one crawl, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CrawlResult {
    posts: Vec<PostRecord>,
}

impl CrawlResult {
    pub fn new(posts: Vec<PostRecord>) -> Self {
        Self { posts }
    }

    /// Joins the results of several sub-forums into one table
    pub fn concat<I>(results: I) -> Self
    where
        I: IntoIterator<Item = CrawlResult>,
    {
        Self {
            posts: results.into_iter().flat_map(|r| r.posts).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PostRecord> {
        self.posts.iter()
    }

    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn into_inner(self) -> Vec<PostRecord> {
        self.posts
    }

    /// The sub-forum shared by every post, or `None` for an empty or mixed result
    pub fn subforum(&self) -> Option<&str> {
        let first = self.posts.first()?.subforum.as_str();
        self.posts
            .iter()
            .all(|p| p.subforum == first)
            .then_some(first)
    }

    /// Total number of comments across all posts
    pub fn comment_count(&self) -> usize {
        self.posts.iter().map(|p| p.comments.len()).sum()
    }
}

impl IntoIterator for CrawlResult {
    type Item = PostRecord;
    type IntoIter = std::vec::IntoIter<PostRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.into_iter()
    }
}

impl<'a> IntoIterator for &'a CrawlResult {
    type Item = &'a PostRecord;
    type IntoIter = std::slice::Iter<'a, PostRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

impl FromIterator<PostRecord> for CrawlResult {
    fn from_iter<T: IntoIterator<Item = PostRecord>>(iter: T) -> Self {
        Self {
            posts: iter.into_iter().collect(),
        }
    }
}
