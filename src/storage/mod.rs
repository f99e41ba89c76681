//! Storage module for deduplication state
//!
//! This module tracks which article and media URLs have already been handled:
//! - In-memory sets for a single run (the default)
//! - An optional SQLite database so membership survives restarts
//! - Scope separation between articles and media

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryDedupStore;
pub use sqlite::SqliteDedupStore;
pub use traits::{DedupScope, DedupStore, StorageError, StorageResult};

use crate::config::DedupConfig;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The pair of stores shared by every worker in a run
#[derive(Clone)]
pub struct DownloadedSet {
    /// Article URLs whose file has been written
    pub articles: Arc<dyn DedupStore>,

    /// Media URLs claimed or downloaded
    pub media: Arc<dyn DedupStore>,
}

impl DownloadedSet {
    /// Fresh in-memory stores
    pub fn in_memory() -> Self {
        Self {
            articles: Arc::new(MemoryDedupStore::new()),
            media: Arc::new(MemoryDedupStore::new()),
        }
    }

    /// Opens the stores described by the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Dedup configuration; without a database path the stores live in memory
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadedSet)` - Stores ready for use
    /// * `Err(StorageError)` - The database could not be opened
    pub fn open(config: &DedupConfig) -> StorageResult<Self> {
        match &config.database_path {
            Some(path) => {
                let path = Path::new(path);
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                info!("Using persistent dedup database {}", path.display());
                Ok(Self {
                    articles: Arc::new(SqliteDedupStore::open(path, DedupScope::Article)?),
                    media: Arc::new(SqliteDedupStore::open(path, DedupScope::Media)?),
                })
            }
            None => Ok(Self::in_memory()),
        }
    }
}

impl std::fmt::Debug for DownloadedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadedSet")
            .field("articles", &self.articles.len().ok())
            .field("media", &self.media.len().ok())
            .finish()
    }
}
