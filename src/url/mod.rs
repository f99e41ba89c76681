//! URL handling module for BBC-Harvest
//!
//! This module provides link resolution for search results and media sources, and
//! the content hash used to derive collision-free file names from URLs.

mod normalize;

use sha2::{Digest, Sha256};

// Re-export main functions
pub use normalize::{resolve_link, resolve_media_url};

/// Returns the hex-encoded SHA-256 digest of a URL
///
/// Used as the stem of media file names and as the fallback stem for articles
/// whose title sanitizes to nothing.
///
/// # Examples
///
/// ```
/// use bbc_harvest::url::url_hash;
///
/// let a = url_hash("https://www.bbc.com/news/a");
/// assert_eq!(a.len(), 64);
/// assert_eq!(a, url_hash("https://www.bbc.com/news/a"));
/// assert_ne!(a, url_hash("https://www.bbc.com/news/b"));
/// ```
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
