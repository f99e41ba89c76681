//! Storage traits and error types
//!
//! This module defines the trait interface for deduplication backends and
//! associated error types.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Which family of URLs a store tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupScope {
    /// Article page URLs, marked once the article file is written
    Article,

    /// Image and video URLs, claimed before the asset is fetched
    Media,
}

impl DedupScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Media => "media",
        }
    }
}

/// URL-keyed membership store
///
/// `mark_seen` is the atomic check-and-insert: it returns `true` only for the caller
/// that inserted the URL, so concurrent workers can use it to claim work.
/// Implementations must be safe to share between tasks.
pub trait DedupStore: Send + Sync {
    /// Returns true if the URL is already in the store
    fn seen(&self, url: &str) -> StorageResult<bool>;

    /// Inserts the URL, returning true if it was not present before
    fn mark_seen(&self, url: &str) -> StorageResult<bool>;

    /// Removes the URL (used to release a claim after a failed download)
    fn forget(&self, url: &str) -> StorageResult<()>;

    /// Number of URLs in the store
    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
