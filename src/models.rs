//! Data model shared by the crawl pipeline
//!
//! Search hits flow from the paginator to the coordinator, articles flow from the
//! extractor to the writer, and summaries end up in the run report.

use serde::{Deserialize, Serialize};

/// Title used by the search paginator when a result carries no heading
pub const NO_TITLE: &str = "No Title";

/// Caption used for images without an enclosing figure caption
pub const NO_CAPTION: &str = "无说明";

/// A candidate article found on a search results page
///
/// This is also the element type of the search-results JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Absolute article URL
    pub url: String,

    /// Title shown on the results page, or [`NO_TITLE`]
    #[serde(default)]
    pub title: String,
}

impl SearchHit {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Returns the title unless it is empty or the "no title" sentinel
    pub fn usable_title(&self) -> Option<&str> {
        let title = self.title.trim();
        if title.is_empty() || title == NO_TITLE {
            None
        } else {
            Some(title)
        }
    }
}

/// Kind of media asset attached to an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Extension used when the content type is missing or unrecognized
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => ".jpg",
            Self::Video => ".mp4",
        }
    }

    /// Infers a file extension from a `Content-Type` header value
    ///
    /// Unknown or absent content types map to [`MediaKind::default_extension`].
    ///
    /// # Examples
    ///
    /// ```
    /// use bbc_harvest::MediaKind;
    ///
    /// assert_eq!(MediaKind::Image.extension_for(Some("image/png")), ".png");
    /// assert_eq!(MediaKind::Image.extension_for(None), ".jpg");
    /// assert_eq!(MediaKind::Video.extension_for(Some("video/webm")), ".webm");
    /// ```
    pub fn extension_for(&self, content_type: Option<&str>) -> &'static str {
        let content_type = content_type.unwrap_or("").to_ascii_lowercase();
        match self {
            Self::Image => {
                if content_type.contains("jpeg") || content_type.contains("jpg") {
                    ".jpg"
                } else if content_type.contains("png") {
                    ".png"
                } else if content_type.contains("gif") {
                    ".gif"
                } else if content_type.contains("webp") {
                    ".webp"
                } else {
                    self.default_extension()
                }
            }
            Self::Video => {
                if content_type.contains("mp4") {
                    ".mp4"
                } else if content_type.contains("webm") {
                    ".webm"
                } else {
                    self.default_extension()
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// A downloaded media asset referenced by an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// Absolute URL the asset was fetched from
    pub source_url: String,

    /// File name inside the image or video directory
    pub local_filename: String,

    /// Figure caption (images only)
    pub caption: Option<String>,
}

/// An extracted article, ready to be written
#[derive(Debug, Clone)]
pub struct Article {
    pub source_url: String,
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
    pub images: Vec<MediaRef>,
    pub videos: Vec<MediaRef>,

    /// Set by the writer once the file name has been derived
    pub filename: Option<String>,
}

impl Article {
    /// Builds the report entry for this article
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            filename: self.filename.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            images: self.images.len(),
            videos: self.videos.len(),
        }
    }
}

/// One entry of the download report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub filename: String,
    pub title: String,
    pub images: usize,
    pub videos: usize,
}

/// Summary JSON written once at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReport {
    pub total_articles: usize,
    pub articles: Vec<ArticleSummary>,
}

impl DownloadReport {
    pub fn new(articles: Vec<ArticleSummary>) -> Self {
        Self {
            total_articles: articles.len(),
            articles,
        }
    }
}
