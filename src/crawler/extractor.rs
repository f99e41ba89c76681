//! Article extraction
//!
//! Fetches an article page, runs the pure parser over it and hands every media
//! candidate to the [`MediaDownloader`]. A failed asset only drops that asset; a page
//! without a body yields no article at all.

use crate::crawler::fetcher::Transport;
use crate::crawler::media::MediaDownloader;
use crate::crawler::parser::parse_article;
use crate::models::{Article, MediaKind, MediaRef, NO_TITLE};
use crate::ExtractionFailure;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub struct ArticleExtractor {
    transport: Arc<dyn Transport>,
    media: Arc<MediaDownloader>,
    site_base: Url,
    home_title: String,
}

impl ArticleExtractor {
    pub fn new(
        transport: Arc<dyn Transport>,
        media: Arc<MediaDownloader>,
        site_base: Url,
        home_title: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            media,
            site_base,
            home_title: home_title.into(),
        }
    }

    /// Extracts an article, logging and swallowing failures
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute article URL
    /// * `fallback_title` - Title from the search results, used when the page has none
    pub async fn extract(&self, url: &str, fallback_title: Option<&str>) -> Option<Article> {
        match self.try_extract(url, fallback_title).await {
            Ok(article) => Some(article),
            Err(failure) => {
                warn!("Skipping article {}: {}", url, failure);
                None
            }
        }
    }

    /// Extracts an article
    ///
    /// The resulting title is the one found on the page, else `fallback_title` unless
    /// it is the "no title" sentinel, else `None`.
    pub async fn try_extract(
        &self,
        url: &str,
        fallback_title: Option<&str>,
    ) -> Result<Article, ExtractionFailure> {
        let response = self.transport.get(url, &[]).await?;
        let page_url = Url::parse(&response.url).unwrap_or_else(|_| self.site_base.clone());
        let html = response.text().await?;

        let parsed = parse_article(&html, &self.home_title)?;
        debug!(
            "Parsed {}: {} paragraphs, {} image candidates, {} video candidates",
            url,
            parsed.paragraphs.len(),
            parsed.images.len(),
            parsed.videos.len()
        );

        let title = parsed.title.or_else(|| {
            fallback_title
                .map(str::trim)
                .filter(|t| !t.is_empty() && *t != NO_TITLE)
                .map(str::to_string)
        });

        let mut images = Vec::new();
        for candidate in parsed.images {
            if let Some(stored) = self
                .media
                .fetch_asset(&candidate.src, &page_url, MediaKind::Image)
                .await
            {
                images.push(MediaRef {
                    caption: Some(candidate.caption),
                    ..stored
                });
            }
        }

        let mut videos = Vec::new();
        for src in parsed.videos {
            if let Some(stored) = self
                .media
                .fetch_asset(&src, &page_url, MediaKind::Video)
                .await
            {
                videos.push(stored);
            }
        }

        Ok(Article {
            source_url: url.to_string(),
            title,
            paragraphs: parsed.paragraphs,
            images,
            videos,
            filename: None,
        })
    }
}
