//! File-based cache store.
//!
//! [`FileStore`] keeps entries in a plain-text file, one entry per line:
//!
//! ```text
//! <cache-key> <base64-payload>
//! ```
//!
//! Keys are alphanumeric and payloads use the Base64 alphabet, so a single
//! space is an unambiguous separator. The file is read once at load and only
//! ever opened for append afterwards.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{CacheError, CacheStore};

/// Append-only [`CacheStore`] backed by a text file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for the file at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> Vec<(String, String)> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_entries(&content, &self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no cache file found, starting empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read cache file, starting empty: {e}");
                Vec::new()
            }
        }
    }

    fn append(&self, entries: &[(String, String)]) -> Result<usize, CacheError> {
        let flush_err = |source| CacheError::Flush {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(flush_err)?;
        }

        let mut buf = String::new();
        for (key, value) in entries {
            buf.push_str(key);
            buf.push(' ');
            buf.push_str(value);
            buf.push('\n');
        }

        // One write per flush keeps lines from concurrent runs mostly intact
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(flush_err)?;
        file.write_all(buf.as_bytes()).map_err(flush_err)?;
        Ok(entries.len())
    }
}

/// Parse `key value` lines, skipping blank and malformed lines.
///
/// The key may be empty: snippets without alphanumeric characters all
/// normalize to the empty key.
fn parse_entries(content: &str, path: &Path) -> Vec<(String, String)> {
    let mut entries = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(' ');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(key), Some(value), None) if !value.is_empty() => {
                entries.push((key.to_owned(), value.to_owned()));
            }
            _ => {
                tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    "skipping malformed cache line"
                );
            }
        }
    }

    entries
}
