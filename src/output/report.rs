//! JSON files: search results in, search results and download report out

use crate::models::{DownloadReport, SearchHit};
use crate::output::{write_atomically, WriterError};
use crate::FormatError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Search-results files probed, in order, when none is given
pub const DEFAULT_RESULTS_FILES: &[&str] = &["advanced_search_results.json", "search_results.json"];

/// Picks the search-results file to read
///
/// An explicit path must exist. Without one, the defaults are probed relative to the
/// working directory.
pub fn resolve_results_path(explicit: Option<&Path>) -> Result<PathBuf, FormatError> {
    resolve_results_path_in(explicit, Path::new("."))
}

/// Like [`resolve_results_path`], probing the defaults inside `dir`
pub fn resolve_results_path_in(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<PathBuf, FormatError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(FormatError::NotFound(path.display().to_string()))
        };
    }

    DEFAULT_RESULTS_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| FormatError::NoDefault(DEFAULT_RESULTS_FILES.join(", ")))
}

/// Reads a search-results JSON array
pub fn load_search_results(path: &Path) -> Result<Vec<SearchHit>, FormatError> {
    let content = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| FormatError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Writes search results as a pretty-printed JSON array
pub async fn write_search_results(path: &Path, hits: &[SearchHit]) -> Result<(), WriterError> {
    write_json(path, hits).await
}

/// Writes the download report
pub async fn write_report(path: &Path, report: &DownloadReport) -> Result<(), WriterError> {
    write_json(path, report).await
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), WriterError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomically(path, json.as_bytes()).await
}
