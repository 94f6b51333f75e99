//! CSV output for crawl results
//!
//! Two layouts:
//! - [`CsvOutput`]: one row per post, the nested comment list JSON-encoded in a
//!   single `comments` column.
//! - [`SplitCsvOutput`]: a post table keyed by `post_id` and a separate comment
//!   table with one row per comment referencing it.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::record::{CrawlResult, PostRecord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::mem::take;
use std::path::{Path, PathBuf};

/// Column order of the post table
pub const POST_COLUMNS: [&str; 7] = [
    "author", "title", "time", "content", "url", "subforum", "comments",
];

/// Column order of the split post table
pub const POST_TABLE_COLUMNS: [&str; 7] = [
    "post_id", "author", "title", "time", "content", "url", "subforum",
];

/// Column order of the comment table
pub const COMMENT_COLUMNS: [&str; 6] = [
    "post_id", "position", "push_tag", "userid", "content", "ipdatetime",
];

/// Writes crawl results to a CSV file, replacing any previous content
pub struct CsvOutput {
    path: PathBuf,
}

impl CsvOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for CsvOutput {
    fn write(&mut self, result: &CrawlResult) -> OutputResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        write_posts(&mut writer, result)?;
        writer.flush()?;

        tracing::info!("Wrote {} rows to {}", result.len(), self.path.display());
        Ok(())
    }
}

/// Writes a post table and a comment table
///
/// `post_id` numbers the posts from 1 in result order; `position` numbers a
/// post's comments from 0 in document order.
pub struct SplitCsvOutput {
    posts_path: PathBuf,
    comments_path: PathBuf,
}

impl SplitCsvOutput {
    pub fn new(posts_path: impl Into<PathBuf>, comments_path: impl Into<PathBuf>) -> Self {
        Self {
            posts_path: posts_path.into(),
            comments_path: comments_path.into(),
        }
    }
}

impl OutputHandler for SplitCsvOutput {
    fn write(&mut self, result: &CrawlResult) -> OutputResult<()> {
        for path in [&self.posts_path, &self.comments_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let mut posts = BufWriter::new(File::create(&self.posts_path)?);
        write_post_table(&mut posts, result)?;
        posts.flush()?;

        let mut comments = BufWriter::new(File::create(&self.comments_path)?);
        write_comment_table(&mut comments, result)?;
        comments.flush()?;

        tracing::info!(
            "Wrote {} posts to {} and {} comments to {}",
            result.len(),
            self.posts_path.display(),
            result.comment_count(),
            self.comments_path.display()
        );
        Ok(())
    }
}

/// Writes the header and one row per post
pub fn write_posts<W: Write>(mut w: W, result: &CrawlResult) -> OutputResult<()> {
    write_row(&mut w, &POST_COLUMNS)?;
    for post in result {
        write_row(&mut w, &post_row(post)?)?;
    }
    Ok(())
}

fn post_row(post: &PostRecord) -> OutputResult<[String; 7]> {
    Ok([
        post.author.clone().unwrap_or_default(),
        post.title.clone(),
        post.time.clone(),
        post.content.clone(),
        post.url.clone(),
        post.subforum.clone(),
        serde_json::to_string(&post.comments)?,
    ])
}

/// Writes the post table header and one row per post, without comments
pub fn write_post_table<W: Write>(mut w: W, result: &CrawlResult) -> OutputResult<()> {
    write_row(&mut w, &POST_TABLE_COLUMNS)?;
    for (index, post) in result.iter().enumerate() {
        write_row(
            &mut w,
            &[
                (index + 1).to_string(),
                post.author.clone().unwrap_or_default(),
                post.title.clone(),
                post.time.clone(),
                post.content.clone(),
                post.url.clone(),
                post.subforum.clone(),
            ],
        )?;
    }
    Ok(())
}

/// Writes the comment table header and one row per comment
pub fn write_comment_table<W: Write>(mut w: W, result: &CrawlResult) -> OutputResult<()> {
    write_row(&mut w, &COMMENT_COLUMNS)?;
    for (index, post) in result.iter().enumerate() {
        let post_id = (index + 1).to_string();
        for (position, comment) in post.comments.iter().enumerate() {
            write_row(
                &mut w,
                &[
                    post_id.clone(),
                    position.to_string(),
                    comment.push_tag.clone().unwrap_or_default(),
                    comment.userid.clone(),
                    comment.content.clone().unwrap_or_default(),
                    comment.ipdatetime.clone(),
                ],
            )?;
        }
    }
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes a single CSV row, quoting fields that need it
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}

/// Parses CSV text into rows (quotes and CRLF tolerant)
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
