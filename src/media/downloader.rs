//! Per-service download backends.
//!
//! YouTube, TikTok and Twitter go through `yt-dlp`: a metadata-only pass first
//! (to enforce the size limit) and then the actual download. Instagram goes
//! through the Cobalt resolver and a plain streamed HTTP GET.

use futures_util::StreamExt;
use reqwest::Client as HttpClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::resolver::{CobaltClient, ResolvedMedia, ResolverError, DEFAULT_PICKER_FILENAME};
use super::title::sanitize_title;
use super::ytdlp::{ExtractOptions, ExtractorError, MediaExtractor, VideoInfo, YtDlp};
use super::{DownloadResult, MediaService};
use crate::config::{
    get_resolver_http_timeout_secs, Settings, DEFAULT_VIDEO_QUALITY, MAX_FILE_SIZE_BYTES,
};

/// Title yt-dlp gives tweets that have no text of their own
const TWITTER_PLACEHOLDER_TITLE: &str = "Twitter";

/// Errors produced while downloading media
#[derive(Debug, Error)]
pub enum DownloadError {
    /// YouTube link that is not a Shorts link
    #[error("Only YouTube Shorts links are supported")]
    NotShorts,
    /// No backend for this service
    #[error("Downloading {0} links is not supported")]
    Unsupported(MediaService),
    /// Declared or streamed size exceeds the Telegram upload limit
    #[error("Video file is too large (>50MB): {size} bytes")]
    TooLarge {
        /// Size in bytes
        size: u64,
    },
    /// yt-dlp failed
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
    /// yt-dlp reported success but left no file behind
    #[error("Downloaded file not found: {0}")]
    MissingOutput(String),
    /// Cobalt could not resolve the link
    #[error("Failed to get media URL from Cobalt API")]
    Resolver,
    /// Fetching the resolved media failed
    #[error("Media request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Writing the media file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads media links into a local directory.
///
/// Every successful download leaves a file the caller owns; remove it with
/// [`MediaDownloader::cleanup`] once it has been relayed.
pub struct MediaDownloader {
    extractor: Arc<dyn MediaExtractor>,
    resolver: CobaltClient,
    http: HttpClient,
    download_dir: PathBuf,
    base_options: ExtractOptions,
    youtube_options: ExtractOptions,
}

impl MediaDownloader {
    /// Build a downloader from settings, using the `yt-dlp` binary and the
    /// configured Cobalt instance.
    ///
    /// # Errors
    ///
    /// Fails if the Cobalt client cannot be created (no API key).
    pub fn new(settings: &Settings) -> Result<Self, ResolverError> {
        let resolver = CobaltClient::new(
            &settings.cobalt_base_url,
            settings.cobalt_api_key.as_deref(),
        )?;

        Ok(Self::with_backends(
            Arc::new(YtDlp::new(settings.ytdlp_path.clone())),
            resolver,
            settings.download_dir(),
            settings.netrc_location.clone(),
            settings.cache_dir.clone(),
        ))
    }

    /// Build a downloader from explicit backends
    #[must_use]
    pub fn with_backends(
        extractor: Arc<dyn MediaExtractor>,
        resolver: CobaltClient,
        download_dir: PathBuf,
        netrc_location: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        let base_options = ExtractOptions::base(&download_dir, MAX_FILE_SIZE_BYTES);
        let youtube_options = base_options
            .clone()
            .with_credentials(netrc_location, cache_dir);

        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(get_resolver_http_timeout_secs()))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build media HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            extractor,
            resolver,
            http,
            download_dir,
            base_options,
            youtube_options,
        }
    }

    /// Download `url` with the backend for `service`.
    ///
    /// # Errors
    ///
    /// Returns the reason the download failed. Failures are also logged here.
    pub async fn download(
        &self,
        service: MediaService,
        url: &str,
    ) -> Result<DownloadResult, DownloadError> {
        info!(service = %service, url = %url, "Downloading media");

        let result = match service {
            MediaService::YouTube => self.try_youtube(url).await,
            MediaService::TikTok => self.try_tiktok(url).await,
            MediaService::Twitter => self.try_twitter(url).await,
            MediaService::Instagram => self.try_instagram(url).await,
            MediaService::Unknown => Err(DownloadError::Unsupported(service)),
        };

        match result {
            Ok(ref downloaded) => {
                info!(
                    service = %service,
                    path = %downloaded.file_path.display(),
                    title = %downloaded.title,
                    "Download finished"
                );
            }
            Err(ref e) => error!(service = %service, url = %url, error = %e, "Download failed"),
        }
        result
    }

    /// Download a YouTube Shorts link. Returns `None` on any failure.
    pub async fn download_youtube(&self, url: &str) -> Option<DownloadResult> {
        self.download(MediaService::YouTube, url).await.ok()
    }

    /// Download a TikTok link. Returns `None` on any failure.
    pub async fn download_tiktok(&self, url: &str) -> Option<DownloadResult> {
        self.download(MediaService::TikTok, url).await.ok()
    }

    /// Download a Twitter / X link. Returns `None` on any failure.
    pub async fn download_twitter(&self, url: &str) -> Option<DownloadResult> {
        self.download(MediaService::Twitter, url).await.ok()
    }

    /// Download an Instagram link through Cobalt. Returns `None` on any failure.
    pub async fn download_instagram(&self, url: &str) -> Option<DownloadResult> {
        self.download(MediaService::Instagram, url).await.ok()
    }

    async fn try_youtube(&self, url: &str) -> Result<DownloadResult, DownloadError> {
        if !url.contains("/shorts/") {
            return Err(DownloadError::NotShorts);
        }
        let (file_path, info) = self.fetch_with_ytdl(url, &self.youtube_options).await?;
        Ok(build_result(file_path, &info))
    }

    async fn try_tiktok(&self, url: &str) -> Result<DownloadResult, DownloadError> {
        let (file_path, info) = self.fetch_with_ytdl(url, &self.base_options).await?;
        Ok(build_result(file_path, &info))
    }

    async fn try_twitter(&self, url: &str) -> Result<DownloadResult, DownloadError> {
        let (file_path, info) = self.fetch_with_ytdl(url, &self.base_options).await?;
        let mut result = build_result(file_path, &info);

        let missing_title = info.title.as_deref().is_none_or(|t| t.trim().is_empty());
        if missing_title || result.title == TWITTER_PLACEHOLDER_TITLE {
            let uploader = self.twitter_uploader(url).await;
            result.title = sanitize_title(&format!(
                "Twitter video by {}",
                uploader.as_deref().unwrap_or("unknown")
            ));
            if result.uploader.is_none() {
                result.uploader = uploader;
            }
        }
        Ok(result)
    }

    /// Uploader of a tweet, from a flat metadata-only lookup
    async fn twitter_uploader(&self, url: &str) -> Option<String> {
        match self
            .extractor
            .extract_info(url, &ExtractOptions::flat(), false)
            .await
        {
            Ok(info) => info.uploader.filter(|u| !u.trim().is_empty()),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch tweet uploader");
                None
            }
        }
    }

    async fn try_instagram(&self, url: &str) -> Result<DownloadResult, DownloadError> {
        let media = self
            .resolver
            .resolve(url, DEFAULT_VIDEO_QUALITY)
            .await
            .ok_or(DownloadError::Resolver)?;

        let file_name = local_file_name(&media);
        let file_path = self
            .download_dir
            .join(format!("instagram_{}_{file_name}", Uuid::new_v4().simple()));

        debug!(media_url = %media.url, path = %file_path.display(), "Fetching Instagram media");
        if let Err(e) = self.fetch_to_file(&media.url, &file_path).await {
            Self::cleanup(&file_path).await;
            return Err(e);
        }

        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(DownloadResult {
            file_path,
            title: sanitize_title(&stem),
            duration_seconds: None,
            uploader: None,
            thumbnail_url: None,
        })
    }

    /// Fetch metadata, enforce the size limit, then download.
    async fn fetch_with_ytdl(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<(PathBuf, VideoInfo), DownloadError> {
        let metadata = self.extractor.extract_info(url, options, false).await?;

        // Unknown size is not a reason to refuse
        if let Some(size) = metadata.filesize {
            if size > MAX_FILE_SIZE_BYTES as f64 {
                return Err(DownloadError::TooLarge { size: size as u64 });
            }
        }

        let info = self.extractor.extract_info(url, options, true).await?;
        let file_path = info
            .output_path()
            .ok_or_else(|| DownloadError::MissingOutput(url.to_string()))?;

        if !tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
            return Err(DownloadError::MissingOutput(
                file_path.display().to_string(),
            ));
        }
        Ok((file_path, info))
    }

    /// Stream `url` into `path`, stopping once the size limit is crossed.
    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<(), DownloadError> {
        let response = self.http.get(url).send().await?.error_for_status()?;

        if let Some(length) = response.content_length() {
            if length > MAX_FILE_SIZE_BYTES {
                return Err(DownloadError::TooLarge { size: length });
            }
        }

        let mut file = File::create(path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > MAX_FILE_SIZE_BYTES {
                return Err(DownloadError::TooLarge { size: written });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Remove a downloaded file. Missing files are ignored; other failures
    /// are logged, never returned.
    pub async fn cleanup(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed downloaded file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!(path = %path.display(), error = %e, "Error cleaning up file"),
        }
    }

    /// Release the resolver's HTTP client
    pub async fn close(&self) {
        self.resolver.close().await;
    }
}

fn build_result(file_path: PathBuf, info: &VideoInfo) -> DownloadResult {
    DownloadResult {
        file_path,
        title: sanitize_title(info.title.as_deref().unwrap_or_default()),
        duration_seconds: info.duration,
        uploader: info.uploader.clone(),
        thumbnail_url: info.thumbnail.clone(),
    }
}

/// Final path component of the resolver's filename, so it cannot escape
/// the download directory.
fn local_file_name(media: &ResolvedMedia) -> String {
    Path::new(&media.filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PICKER_FILENAME.to_string())
}
