//! In-memory deduplication store
//!
//! Membership resets with every process, which matches a plain single-run crawl.

use crate::storage::traits::{DedupStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Set-backed dedup store guarded by a single mutex
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    urls: Mutex<HashSet<String>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with the given URLs
    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: Mutex::new(urls.into_iter().map(Into::into).collect()),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashSet<String>>> {
        self.urls.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl DedupStore for MemoryDedupStore {
    fn seen(&self, url: &str) -> StorageResult<bool> {
        Ok(self.lock()?.contains(url))
    }

    fn mark_seen(&self, url: &str) -> StorageResult<bool> {
        Ok(self.lock()?.insert(url.to_string()))
    }

    fn forget(&self, url: &str) -> StorageResult<()> {
        self.lock()?.remove(url);
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.len())
    }
}
