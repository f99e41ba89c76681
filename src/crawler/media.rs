//! Media asset download
//!
//! Images and videos are claimed in the media dedup store before any request is
//! made, streamed to a `.part` file and renamed into place. A failed download
//! releases its claim so a later article may try the same asset again.

use crate::crawler::fetcher::{BodyStream, Transport};
use crate::models::{MediaKind, MediaRef};
use crate::storage::DedupStore;
use crate::url::{resolve_media_url, url_hash};
use crate::MediaFailure;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

/// Downloads media assets into the image and video directories
pub struct MediaDownloader {
    transport: Arc<dyn Transport>,
    seen: Arc<dyn DedupStore>,
    site_base: Url,
    images_dir: PathBuf,
    videos_dir: PathBuf,
}

impl MediaDownloader {
    pub fn new(
        transport: Arc<dyn Transport>,
        seen: Arc<dyn DedupStore>,
        site_base: Url,
        images_dir: impl Into<PathBuf>,
        videos_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            seen,
            site_base,
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    /// Directory assets of the given kind are written to
    pub fn directory(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Image => &self.images_dir,
            MediaKind::Video => &self.videos_dir,
        }
    }

    /// Downloads one asset, logging and swallowing any failure
    ///
    /// # Returns
    ///
    /// * `Some(MediaRef)` - The asset was stored (caption left unset)
    /// * `None` - The asset was already claimed in this run, or the download failed
    pub async fn fetch_asset(&self, src: &str, page_url: &Url, kind: MediaKind) -> Option<MediaRef> {
        match self.try_fetch_asset(src, page_url, kind).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to download {} {}: {}", kind.as_str(), src, e);
                None
            }
        }
    }

    /// Downloads one asset
    ///
    /// `Ok(None)` means the URL had already been claimed.
    pub async fn try_fetch_asset(
        &self,
        src: &str,
        page_url: &Url,
        kind: MediaKind,
    ) -> Result<Option<MediaRef>, MediaFailure> {
        let url = resolve_media_url(src, &self.site_base, page_url)
            .ok_or_else(|| MediaFailure::InvalidUrl(src.to_string()))?;

        if !self.seen.mark_seen(&url)? {
            debug!("Skipping already downloaded {} {}", kind.as_str(), url);
            return Ok(None);
        }

        match self.download(&url, kind).await {
            Ok(filename) => {
                debug!("Saved {} {} as {}", kind.as_str(), url, filename);
                Ok(Some(MediaRef {
                    source_url: url,
                    local_filename: filename,
                    caption: None,
                }))
            }
            Err(e) => {
                if let Err(release) = self.seen.forget(&url) {
                    warn!("Could not release claim on {}: {}", url, release);
                }
                Err(e)
            }
        }
    }

    async fn download(&self, url: &str, kind: MediaKind) -> Result<String, MediaFailure> {
        let response = self.transport.get(url, &[]).await?;

        let extension = kind.extension_for(response.content_type.as_deref());
        let filename = format!("{}{}", url_hash(url), extension);

        let dir = self.directory(kind);
        tokio::fs::create_dir_all(dir).await?;
        let final_path = dir.join(&filename);
        let part_path = dir.join(format!("{}.part", filename));

        let written = match stream_to_file(response.into_stream(), &part_path).await {
            Ok(()) => tokio::fs::rename(&part_path, &final_path)
                .await
                .map_err(MediaFailure::from),
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        Ok(filename)
    }
}

async fn stream_to_file(mut body: BodyStream, path: &Path) -> Result<(), MediaFailure> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
