//! Media link handling
//!
//! Classifies incoming links by service, resolves them through the Cobalt API
//! or `yt-dlp`, and produces local files ready to be relayed.

/// Link classification by service
pub mod classifier;
/// Per-service download backends
pub mod downloader;
/// Cobalt resolver API client
pub mod resolver;
/// Caption title sanitization
pub mod title;
/// `yt-dlp` process wrapper
pub mod ytdlp;

pub use classifier::{classify, extract_media_id, validate_url};
pub use downloader::{DownloadError, MediaDownloader};
pub use resolver::{CobaltClient, ResolvedMedia, ResolverError, ResolverResponse};

use std::fmt;
use std::path::PathBuf;

/// Services the bot knows how to download from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaService {
    /// Instagram posts and reels
    Instagram,
    /// TikTok videos
    TikTok,
    /// YouTube Shorts
    YouTube,
    /// Twitter / X posts
    Twitter,
    /// Anything else
    Unknown,
}

impl MediaService {
    /// Lowercase service tag used in logs and messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::TikTok => "tiktok",
            Self::YouTube => "youtube",
            Self::Twitter => "twitter",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downloaded media file plus the metadata used for its caption.
///
/// The file at `file_path` belongs to whoever holds the result and must be
/// removed with [`MediaDownloader::cleanup`] once it has been relayed.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    /// Local file location
    pub file_path: PathBuf,
    /// Sanitized title, at most 64 characters
    pub title: String,
    /// Duration in seconds, when the backend reports one
    pub duration_seconds: Option<f64>,
    /// Uploader name or handle
    pub uploader: Option<String>,
    /// Thumbnail URL
    pub thumbnail_url: Option<String>,
}
