//! Persistent snippet cache for mdtex.
//!
//! Rendering a LaTeX snippet means two external process invocations, so every
//! rendered image is remembered under its cache key. Two layers form the API:
//!
//! - [`CacheStore`]: persistent backing store that can be read once and
//!   appended to
//! - [`ContentCache`]: in-memory key → artifact map plus a buffer of entries
//!   produced during the current run
//!
//! # Implementations
//!
//! - [`NullStore`]: No-op store (nothing is loaded, flush discards)
//! - [`FileStore`]: Append-only text file with one `key value` line per entry
//!
//! # Example
//!
//! ```
//! use mdtex_cache::{ContentCache, NullStore};
//!
//! let mut cache = ContentCache::load(Box::new(NullStore));
//! cache.record("xsquared", "iVBORw0KGgo=");
//! assert_eq!(cache.lookup("xsquared"), Some("iVBORw0KGgo="));
//! // NullStore persists nothing, so nothing is reported as written
//! assert_eq!(cache.flush().unwrap(), 0);
//! assert_eq!(cache.pending(), 0);
//! ```

mod file;
pub use file::FileStore;

use std::collections::HashMap;
use std::path::PathBuf;

/// Cache store error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store could not be opened or written for append.
    #[error("failed to write cache store {}: {source}", path.display())]
    Flush {
        /// Path of the store.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Persistent backing store for a [`ContentCache`].
///
/// Stores are append-only: entries are never updated or deleted once written.
pub trait CacheStore: Send + Sync {
    /// Read every entry from the store.
    ///
    /// A missing or unreadable store yields no entries. Implementations log
    /// what they skipped instead of failing.
    fn load(&self) -> Vec<(String, String)>;

    /// Append entries to the store in the given order.
    ///
    /// Returns the number of entries actually persisted.
    fn append(&self, entries: &[(String, String)]) -> Result<usize, CacheError>;
}

/// No-op [`CacheStore`] used when persistent caching is disabled.
pub struct NullStore;

impl CacheStore for NullStore {
    fn load(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn append(&self, _entries: &[(String, String)]) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// In-memory snippet cache backed by a [`CacheStore`].
///
/// Entries loaded from the store and entries recorded during a run are both
/// served by [`lookup`](Self::lookup). Recorded entries are additionally held
/// in a pending buffer until [`flush`](Self::flush) appends them to the store.
pub struct ContentCache {
    store: Box<dyn CacheStore>,
    entries: HashMap<String, String>,
    pending: Vec<(String, String)>,
}

impl ContentCache {
    /// Create a cache populated from `store`.
    #[must_use]
    pub fn load(store: Box<dyn CacheStore>) -> Self {
        let entries: HashMap<String, String> = store.load().into_iter().collect();
        tracing::debug!(entries = entries.len(), "loaded snippet cache");
        Self {
            store,
            entries,
            pending: Vec::new(),
        }
    }

    /// Look up a cached artifact.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Record a newly produced artifact.
    ///
    /// Recording a key that is already pending replaces its buffered value
    /// instead of buffering a second line.
    pub fn record(&mut self, key: impl Into<String>, artifact: impl Into<String>) {
        let key = key.into();
        let artifact = artifact.into();

        if let Some(slot) = self.pending.iter_mut().find(|(k, _)| *k == key) {
            slot.1.clone_from(&artifact);
        } else {
            self.pending.push((key.clone(), artifact.clone()));
        }
        self.entries.insert(key, artifact);
    }

    /// Number of entries available for lookup.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded entries not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append all pending entries to the store.
    ///
    /// Returns the number of entries the store persisted, which is zero for
    /// [`NullStore`]. The pending buffer is cleared either way. On failure
    /// the buffer is kept so a later flush can retry.
    pub fn flush(&mut self) -> Result<usize, CacheError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let written = self.store.append(&self.pending)?;
        self.pending.clear();
        tracing::info!(entries = written, "flushed snippet cache");
        Ok(written)
    }
}
