//! Output module for article files and run reports
//!
//! This module handles:
//! - Writing article text files with collision-free names
//! - Reading and writing the search-results JSON
//! - Writing the download report
//! - Printing run statistics

mod article;
mod report;
pub mod stats;

pub use article::{
    derive_stem, existing_article_urls, format_article, ArticleWriter, MAX_STEM_CHARS,
};
pub use report::{
    load_search_results, resolve_results_path, resolve_results_path_in, write_report,
    write_search_results, DEFAULT_RESULTS_FILES,
};
pub use stats::{print_statistics, RunStatistics};

use crate::storage::StorageError;
use std::path::Path;
use thiserror::Error;

/// Errors raised while writing output files
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to record written URL: {0}")]
    Storage(#[from] StorageError),

    #[error("File name registry lock poisoned")]
    Poisoned,
}

/// Writes `bytes` to `<path>.part` and renames it over `path`
///
/// Parent directories are created as needed. The partial file is removed on failure.
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), WriterError> {
    let io_error = |source: std::io::Error| WriterError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = std::path::PathBuf::from(part);

    let result = match tokio::fs::write(&part, bytes).await {
        Ok(()) => tokio::fs::rename(&part, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(io_error(e));
    }

    Ok(())
}
