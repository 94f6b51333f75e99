//! Author anonymisation for crawl results
//!
//! Replaces user names with stable anonymous identifiers and keeps the mapping
//! so it can be saved next to the data and reversed later.
//!
//! # Example
//!
//! ```
//! use ptt_harvest::anonymise::{AnonymiseMethod, UserAnonymiser};
//!
//! let mut anonymiser = UserAnonymiser::new(AnonymiseMethod::Sequential, 42, 8);
//! assert_eq!(anonymiser.anonymise_name(Some("alice")), "user_00000001");
//! assert_eq!(anonymiser.anonymise_name(Some("alice")), "user_00000001");
//! assert_eq!(anonymiser.anonymise_name(None), "UNKNOWN");
//! ```

mod method;

pub use method::AnonymiseMethod;

use crate::output::csv::{parse_rows, write_row};
use crate::record::{CommentRecord, CrawlResult, PostRecord};
use crate::AnonymiseError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Identifier given to absent or empty names
pub const UNKNOWN_USER: &str = "UNKNOWN";

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ID_LENGTH: usize = 8;

/// Maps user names to anonymous identifiers, remembering every assignment
#[derive(Debug, Clone)]
pub struct UserAnonymiser {
    method: AnonymiseMethod,
    seed: u64,
    id_length: usize,
    mapping: BTreeMap<String, String>,
    reverse_mapping: BTreeMap<String, String>,
    counter: u64,
}

impl Default for UserAnonymiser {
    fn default() -> Self {
        Self::new(AnonymiseMethod::Hash, DEFAULT_SEED, DEFAULT_ID_LENGTH)
    }
}

impl UserAnonymiser {
    pub fn new(method: AnonymiseMethod, seed: u64, id_length: usize) -> Self {
        Self {
            method,
            seed,
            id_length,
            mapping: BTreeMap::new(),
            reverse_mapping: BTreeMap::new(),
            counter: 1,
        }
    }

    /// Returns the anonymous id of `name`, assigning one on first sight
    pub fn anonymise_name(&mut self, name: Option<&str>) -> String {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return UNKNOWN_USER.to_string(),
        };

        if let Some(existing) = self.mapping.get(name) {
            return existing.clone();
        }

        let anon_id = match self.method {
            AnonymiseMethod::Hash => method::hash_id(name, self.seed, self.id_length),
            AnonymiseMethod::RandomString => {
                method::random_string_id(name, self.seed, self.id_length)
            }
            AnonymiseMethod::Uuid => method::uuid_id(name, self.seed, self.id_length),
            AnonymiseMethod::Sequential => {
                let id = method::sequential_id(self.counter, self.id_length);
                self.counter += 1;
                id
            }
            AnonymiseMethod::Numeric => method::numeric_id(name, self.seed, self.id_length),
        };

        self.mapping.insert(name.to_string(), anon_id.clone());
        self.reverse_mapping.insert(anon_id.clone(), name.to_string());
        anon_id
    }

    /// Returns the original name behind `anon_id`, if it was assigned here
    pub fn deanonymise_id(&self, anon_id: &str) -> Option<&str> {
        self.reverse_mapping.get(anon_id).map(String::as_str)
    }

    /// Original name → anonymous id
    pub fn mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    /// Anonymous id → original name
    pub fn reverse_mapping(&self) -> &BTreeMap<String, String> {
        &self.reverse_mapping
    }

    /// Returns a copy of `result` with post authors and commenter ids replaced
    ///
    /// Both columns share one mapping, so a user keeps the same id whether they
    /// posted or commented. Absent authors become [`UNKNOWN_USER`].
    pub fn anonymise_result(&mut self, result: &CrawlResult) -> CrawlResult {
        result
            .iter()
            .map(|post| {
                let author = Some(self.anonymise_name(post.author.as_deref()));
                let comments = post
                    .comments
                    .iter()
                    .map(|comment| CommentRecord {
                        userid: self.anonymise_name(Some(&comment.userid)),
                        ..comment.clone()
                    })
                    .collect();
                PostRecord {
                    author,
                    comments,
                    ..post.clone()
                }
            })
            .collect()
    }

    /// Saves the mapping as a two-column CSV file (`original,anonymous`)
    pub fn save_mapping(&self, path: &Path) -> Result<(), AnonymiseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        write_row(&mut writer, &["original", "anonymous"])?;
        for (original, anonymous) in &self.mapping {
            write_row(&mut writer, &[original, anonymous])?;
        }
        writer.flush()?;

        tracing::info!("Mapping saved to {}", path.display());
        Ok(())
    }

    /// Replaces the mapping with the one saved at `path`
    ///
    /// For the sequential method the counter resumes after the highest loaded id.
    pub fn load_mapping(&mut self, path: &Path) -> Result<(), AnonymiseError> {
        let text = std::fs::read_to_string(path)?;
        let mut rows = parse_rows(&text).into_iter().enumerate();

        match rows.next() {
            Some((_, header)) if header == ["original", "anonymous"] => {}
            _ => {
                return Err(AnonymiseError::MappingFormat {
                    line: 1,
                    message: "expected header 'original,anonymous'".to_string(),
                })
            }
        }

        let mut mapping = BTreeMap::new();
        let mut reverse_mapping = BTreeMap::new();
        for (index, row) in rows {
            let [original, anonymous]: [String; 2] =
                row.try_into().map_err(|row: Vec<String>| AnonymiseError::MappingFormat {
                    line: index + 1,
                    message: format!("expected 2 columns, found {}", row.len()),
                })?;
            reverse_mapping.insert(anonymous.clone(), original.clone());
            mapping.insert(original, anonymous);
        }

        if self.method == AnonymiseMethod::Sequential {
            let highest = mapping
                .values()
                .filter_map(|id| id.strip_prefix("user_")?.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            self.counter = highest + 1;
        }

        self.mapping = mapping;
        self.reverse_mapping = reverse_mapping;
        tracing::info!("Mapping loaded from {}", path.display());
        Ok(())
    }
}
