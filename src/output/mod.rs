//! Output module for crawl results
//!
//! This module handles:
//! - Writing posts to CSV files, either with nested comments or as separate
//!   post and comment tables
//! - Storing posts and comments in a SQLite database
//! - Naming the per-sub-forum output files

pub mod csv;
mod sqlite;
mod traits;

pub use self::csv::{CsvOutput, SplitCsvOutput};
pub use sqlite::SqliteOutput;
pub use traits::{OutputHandler, OutputResult};

use std::path::{Path, PathBuf};

/// Path of the CSV file holding one sub-forum's posts
pub fn data_file(directory: &Path, subforum: &str) -> PathBuf {
    directory.join(format!("{}_data.csv", subforum))
}

/// Path of the user mapping shared by every sub-forum of a run
pub fn mapping_file(directory: &Path) -> PathBuf {
    directory.join("user_mapping.csv")
}

/// Path of the post table covering every crawled sub-forum
pub fn combined_file(directory: &Path) -> PathBuf {
    directory.join("main_data.csv")
}

/// Path of the comment table matching [`combined_file`]
pub fn comments_file(directory: &Path) -> PathBuf {
    directory.join("comments_data.csv")
}
