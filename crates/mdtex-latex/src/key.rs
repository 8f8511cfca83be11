//! Snippet cache key computation.
//!
//! Provides [`CacheKey`], the normalized projection of a snippet used to
//! deduplicate rendering work.

use std::fmt;

use crate::consts::ID_LEN;
use crate::scanner::Mode;

/// Normalized snippet identity.
///
/// The key keeps only the alphanumeric characters of the snippet content, so
/// whitespace or punctuation edits do not force a re-render. Keys are
/// mode-agnostic unless built with `include_mode`, in which case a one-letter
/// mode tag (`m` or `t`) is prepended.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for a snippet.
    #[must_use]
    pub fn new(content: &str, mode: Mode, include_mode: bool) -> Self {
        let mut key = String::with_capacity(content.len() + 1);
        if include_mode {
            key.push(match mode {
                Mode::Math => 'm',
                Mode::Text => 't',
            });
        }
        key.extend(content.chars().filter(|c| c.is_alphanumeric()));
        Self(key)
    }

    /// Key as stored in the cache.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short identifier: the first characters of the key.
    #[must_use]
    pub fn short_id(&self) -> &str {
        match self.0.char_indices().nth(ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
