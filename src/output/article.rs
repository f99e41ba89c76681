//! Article text files
//!
//! Each extracted article becomes one UTF-8 text file named after its title. The
//! layout is read by downstream tooling, so it must not drift.

use crate::models::Article;
use crate::output::{write_atomically, WriterError};
use crate::storage::DedupStore;
use crate::url::url_hash;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Longest file stem, in characters
pub const MAX_STEM_CHARS: usize = 100;

/// Hex digits of the URL hash appended to a colliding stem
const COLLISION_SUFFIX_HEX: usize = 8;

const ARTICLE_EXTENSION: &str = ".txt";
const URL_LINE_PREFIX: &str = "网址: ";

/// Characters that are illegal in file names on at least one common platform
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Derives the file stem for an article
///
/// Forbidden and control characters are removed, the result is trimmed and capped at
/// [`MAX_STEM_CHARS`] characters. A missing or empty title falls back to the SHA-256
/// hex of the URL.
///
/// # Examples
///
/// ```
/// use bbc_harvest::output::derive_stem;
///
/// assert_eq!(derive_stem("https://x", Some(" Mars: the \"red\" planet? ")), "Mars the red planet");
/// assert_eq!(derive_stem("https://x", Some("???")).len(), 64);
/// ```
pub fn derive_stem(url: &str, title: Option<&str>) -> String {
    let cleaned: String = title
        .unwrap_or("")
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();
    let stem: String = cleaned.trim().chars().take(MAX_STEM_CHARS).collect();

    if stem.is_empty() {
        url_hash(url)
    } else {
        stem
    }
}

/// Renders an article in the text file layout
pub fn format_article(article: &Article) -> String {
    let mut out = format!(
        "标题: {}\n{}{}\n\n正文内容:\n{}",
        article.title.as_deref().unwrap_or(""),
        URL_LINE_PREFIX,
        article.source_url,
        article.paragraphs.join("\n\n")
    );

    if !article.images.is_empty() {
        out.push_str("\n\n图片列表:\n");
        for (i, image) in article.images.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} - {}\n",
                i + 1,
                image.local_filename,
                image.caption.as_deref().unwrap_or("")
            ));
        }
    }

    if !article.videos.is_empty() {
        out.push_str("\n\n视频列表:\n");
        for (i, video) in article.videos.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, video.local_filename));
        }
    }

    out
}

/// Writes article files and records their URLs as done
pub struct ArticleWriter {
    dir: PathBuf,
    seen: Arc<dyn DedupStore>,
    used_stems: Mutex<HashSet<String>>,
}

impl ArticleWriter {
    pub fn new(dir: impl Into<PathBuf>, seen: Arc<dyn DedupStore>) -> Self {
        Self {
            dir: dir.into(),
            seen,
            used_stems: Mutex::new(HashSet::new()),
        }
    }

    /// Writes the article and marks its URL as seen
    ///
    /// Sets `article.filename` and returns it. The URL is only marked once the file
    /// is in place, so a failed write leaves the article eligible for another attempt.
    pub async fn write(&self, article: &mut Article) -> Result<String, WriterError> {
        let stem = self.reserve_stem(&article.source_url, article.title.as_deref())?;
        let filename = format!("{}{}", stem, ARTICLE_EXTENSION);
        let path = self.dir.join(&filename);

        if let Err(e) = write_atomically(&path, format_article(article).as_bytes()).await {
            self.release_stem(&stem);
            return Err(e);
        }

        self.seen.mark_seen(&article.source_url)?;
        debug!("Wrote {}", path.display());

        article.filename = Some(filename.clone());
        Ok(filename)
    }

    /// Picks a file stem not yet used in this run
    fn reserve_stem(&self, url: &str, title: Option<&str>) -> Result<String, WriterError> {
        let stem = derive_stem(url, title);
        let mut used = self.used_stems.lock().map_err(|_| WriterError::Poisoned)?;

        let stem = if used.contains(&stem) {
            let prefix: String = stem
                .chars()
                .take(MAX_STEM_CHARS - COLLISION_SUFFIX_HEX - 1)
                .collect();
            let hash = url_hash(url);
            format!("{}-{}", prefix, &hash[..COLLISION_SUFFIX_HEX])
        } else {
            stem
        };

        used.insert(stem.clone());
        Ok(stem)
    }

    fn release_stem(&self, stem: &str) {
        if let Ok(mut used) = self.used_stems.lock() {
            used.remove(stem);
        }
    }
}

/// Reads the source URL back from every article file in `dir`
///
/// A missing directory yields an empty list.
pub fn existing_article_urls(dir: &Path) -> std::io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut urls = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping unreadable {}: {}", path.display(), e);
                continue;
            }
        };

        if let Some(url) = content
            .lines()
            .find_map(|line| line.strip_prefix(URL_LINE_PREFIX))
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            urls.push(url.to_string());
        }
    }

    info!("Found {} existing articles in {}", urls.len(), dir.display());
    Ok(urls)
}
