//! SQLite output handler
//!
//! Stores posts and their comments in two tables. A post URL appears at most
//! once: writing it again replaces the earlier row and its comments.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::record::CrawlResult;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQL schema for the results database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    subforum TEXT NOT NULL,
    author TEXT,
    title TEXT NOT NULL,
    time TEXT NOT NULL,
    content TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_subforum ON posts(subforum);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    push_tag TEXT,
    userid TEXT NOT NULL,
    content TEXT,
    ipdatetime TEXT NOT NULL,
    UNIQUE(post_id, position)
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
"#;

/// SQLite-based output handler
pub struct SqliteOutput {
    conn: Connection,
}

impl SqliteOutput {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Number of stored posts
    pub fn count_posts(&self) -> OutputResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Number of stored comments
    pub fn count_comments(&self) -> OutputResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Comment user ids of a post, in document order
    pub fn comment_userids(&self, url: &str) -> OutputResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.userid FROM comments c JOIN posts p ON p.id = c.post_id
             WHERE p.url = ?1 ORDER BY c.position",
        )?;
        let ids = stmt
            .query_map(params![url], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

impl OutputHandler for SqliteOutput {
    fn write(&mut self, result: &CrawlResult) -> OutputResult<()> {
        let crawled_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        for post in result {
            tx.execute("DELETE FROM posts WHERE url = ?1", params![post.url])?;
            tx.execute(
                "INSERT INTO posts (url, subforum, author, title, time, content, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.url,
                    post.subforum,
                    post.author,
                    post.title,
                    post.time,
                    post.content,
                    crawled_at
                ],
            )?;
            let post_id = tx.last_insert_rowid();

            for (position, comment) in post.comments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO comments (post_id, position, push_tag, userid, content, ipdatetime)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        post_id,
                        position as i64,
                        comment.push_tag,
                        comment.userid,
                        comment.content,
                        comment.ipdatetime
                    ],
                )?;
            }
        }

        tx.commit()?;
        tracing::info!("Stored {} posts in SQLite", result.len());
        Ok(())
    }
}
