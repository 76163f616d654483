//! Link relay flow: download a classified link and send it back as a video.
//!
//! One status message follows each link through
//! `processing → downloading → uploading` and is removed once the video is
//! delivered. Failures either replace the status text or, for Twitter, are
//! turned into a reply with a `fixupx.com` viewer link.

// lazy_regex! statics use once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use crate::bot::resilient::{delete_status, edit_status_resilient, reply_resilient};
use crate::bot::views::{DefaultRelayView, RelayView};
use crate::media::{DownloadResult, MediaDownloader, MediaService};
use anyhow::Result;
use lazy_regex::lazy_regex;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, ReplyParameters};
use tracing::{error, info, warn};

/// Twitter / X host, with or without `www.`
static RE_TWITTER_HOST: lazy_regex::Lazy<Regex> = lazy_regex!(r"\b(?:www\.)?(?:twitter|x)\.com\b");

/// Host of the alternate tweet viewer
const FIXUP_HOST: &str = "fixupx.com";

/// Stage at which a relay failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The backend produced no file
    Download,
    /// Sending the file to Telegram failed
    Upload,
}

/// What to show the user after a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReply {
    /// Remove the status message and reply with this text instead
    Reply(String),
    /// Replace the status message text
    EditStatus(String),
}

/// Point a Twitter / X link at the `fixupx.com` viewer.
///
/// Only the first host occurrence is rewritten.
///
/// # Examples
///
/// ```
/// use oxide_media_relay::bot::relay::fixup_twitter_url;
///
/// assert_eq!(
///     fixup_twitter_url("https://x.com/user/status/12345"),
///     "https://fixupx.com/user/status/12345"
/// );
/// ```
#[must_use]
pub fn fixup_twitter_url(url: &str) -> String {
    RE_TWITTER_HOST.replace(url, FIXUP_HOST).into_owned()
}

/// Format seconds as `m:ss`.
///
/// Returns `None` for zero, negative and non-finite values.
#[must_use]
pub fn format_duration(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let total = seconds as u64;
    Some(format!("{}:{:02}", total / 60, total % 60))
}

/// Caption for a relayed video: title, then uploader and duration when known.
#[must_use]
pub fn build_caption(result: &DownloadResult) -> String {
    let mut caption = format!("🎥 {}", result.title);
    if let Some(uploader) = result.uploader.as_deref().filter(|u| !u.is_empty()) {
        caption.push_str(&format!("\n👤 {uploader}"));
    }
    if let Some(duration) = result.duration_seconds.and_then(format_duration) {
        caption.push_str(&format!("\n⏱ {duration}"));
    }
    caption
}

/// Whether a failure text reports that Instagram wants a login
fn is_login_required(error: &str) -> bool {
    error.to_lowercase().contains("login required")
}

/// Choose the failure message for `service`.
#[must_use]
pub fn failure_reply(
    service: MediaService,
    url: &str,
    error: &str,
    stage: FailureStage,
) -> FailureReply {
    match service {
        MediaService::Twitter => {
            let fixed = fixup_twitter_url(url);
            FailureReply::Reply(match stage {
                FailureStage::Download => DefaultRelayView::twitter_no_media(&fixed),
                FailureStage::Upload => DefaultRelayView::twitter_failed(&fixed),
            })
        }
        MediaService::Instagram if is_login_required(error) => {
            FailureReply::EditStatus(DefaultRelayView::instagram_login_required().to_string())
        }
        _ => FailureReply::EditStatus(DefaultRelayView::processing_error(service, error)),
    }
}

/// Download `url` and send the result to the chat of `msg`.
///
/// # Errors
///
/// Returns an error only if the first status message cannot be sent; every
/// later failure is reported to the user and logged.
pub async fn relay_link(
    bot: &Bot,
    msg: &Message,
    service: MediaService,
    url: &str,
    downloader: &MediaDownloader,
) -> Result<()> {
    info!(chat_id = %msg.chat.id, service = %service, url = %url, "Relaying link");

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        warn!(error = %e, "Failed to send typing action");
    }

    let status = reply_resilient(bot, msg, DefaultRelayView::processing(service)).await?;
    edit_status_resilient(bot, &status, DefaultRelayView::downloading(service)).await;

    let result = match downloader.download(service, url).await {
        Ok(result) => result,
        Err(e) => {
            report_failure(bot, msg, &status, service, url, &e.to_string(), FailureStage::Download)
                .await;
            return Ok(());
        }
    };

    edit_status_resilient(bot, &status, DefaultRelayView::uploading()).await;
    let sent = upload_video(bot, msg, &result).await;
    MediaDownloader::cleanup(&result.file_path).await;

    match sent {
        Ok(()) => {
            info!(chat_id = %msg.chat.id, service = %service, "Video delivered");
            delete_status(bot, &status).await;
        }
        Err(e) => {
            error!(service = %service, error = %e, "Error processing {service} link");
            report_failure(bot, msg, &status, service, url, &e.to_string(), FailureStage::Upload)
                .await;
        }
    }
    Ok(())
}

async fn upload_video(
    bot: &Bot,
    msg: &Message,
    result: &DownloadResult,
) -> Result<(), teloxide::RequestError> {
    // A fresh action, the typing one has expired by now
    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::UploadVideo).await {
        warn!(error = %e, "Failed to send upload action");
    }

    bot.send_video(msg.chat.id, InputFile::file(&result.file_path))
        .caption(build_caption(result))
        .supports_streaming(true)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

async fn report_failure(
    bot: &Bot,
    msg: &Message,
    status: &Message,
    service: MediaService,
    url: &str,
    error: &str,
    stage: FailureStage,
) {
    match failure_reply(service, url, error, stage) {
        FailureReply::Reply(text) => {
            delete_status(bot, status).await;
            if let Err(e) = reply_resilient(bot, msg, text).await {
                error!(error = %e, "Failed to send fallback link");
            }
        }
        FailureReply::EditStatus(text) => {
            edit_status_resilient(bot, status, &text).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ytdlp::ExtractorError;
    use crate::media::DownloadError;
    use std::path::PathBuf;

    fn result(uploader: Option<&str>, duration: Option<f64>) -> DownloadResult {
        DownloadResult {
            file_path: PathBuf::from("/tmp/x.mp4"),
            title: "Cat video".to_string(),
            duration_seconds: duration,
            uploader: uploader.map(String::from),
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_fixup_twitter_url() {
        assert_eq!(
            fixup_twitter_url("https://twitter.com/user/status/12345"),
            "https://fixupx.com/user/status/12345"
        );
        assert_eq!(
            fixup_twitter_url("https://x.com/user/status/12345"),
            "https://fixupx.com/user/status/12345"
        );
        assert_eq!(
            fixup_twitter_url("https://www.twitter.com/user/status/1"),
            "https://fixupx.com/user/status/1"
        );
        assert_eq!(
            fixup_twitter_url("x.com/box.com/status/1"),
            "fixupx.com/box.com/status/1"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(125.7).as_deref(), Some("2:05"));
        assert_eq!(format_duration(59.99).as_deref(), Some("0:59"));
        assert_eq!(format_duration(3600.0).as_deref(), Some("60:00"));
        assert_eq!(format_duration(0.0), None);
        assert_eq!(format_duration(-3.0), None);
        assert_eq!(format_duration(f64::NAN), None);
        assert_eq!(format_duration(f64::INFINITY), None);
    }

    #[test]
    fn test_build_caption() {
        assert_eq!(
            build_caption(&result(Some("cat_lover"), Some(125.7))),
            "🎥 Cat video\n👤 cat_lover\n⏱ 2:05"
        );
        assert_eq!(build_caption(&result(None, None)), "🎥 Cat video");
        assert_eq!(build_caption(&result(Some(""), Some(0.0))), "🎥 Cat video");
    }

    #[test]
    fn test_twitter_failure_offers_viewer_link() {
        assert_eq!(
            failure_reply(
                MediaService::Twitter,
                "https://twitter.com/user/status/12345",
                "ERROR: No video could be found in this tweet",
                FailureStage::Download
            ),
            FailureReply::Reply(
                "No downloadable media found. Here's a better link:\nhttps://fixupx.com/user/status/12345"
                    .to_string()
            )
        );
        assert_eq!(
            failure_reply(
                MediaService::Twitter,
                "https://x.com/user/status/12345",
                "upload failed",
                FailureStage::Upload
            ),
            FailureReply::Reply(
                "❌ Couldn't download media. Here's a better link:\nhttps://fixupx.com/user/status/12345"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_instagram_login_required() {
        let reply = failure_reply(
            MediaService::Instagram,
            "https://instagram.com/p/x",
            "ERROR: Login Required",
            FailureStage::Download,
        );
        assert_eq!(
            reply,
            FailureReply::EditStatus(DefaultRelayView::instagram_login_required().to_string())
        );
    }

    #[test]
    fn test_login_required_from_extractor_error() {
        let err = DownloadError::Extractor(ExtractorError::Failed {
            code: Some(1),
            message: "ERROR: [Instagram] abc: Login required to access this post".to_string(),
        });
        assert!(is_login_required(&err.to_string()));
        assert!(!is_login_required(&DownloadError::Resolver.to_string()));
    }

    #[test]
    fn test_generic_failure() {
        assert_eq!(
            failure_reply(
                MediaService::TikTok,
                "https://vm.tiktok.com/x",
                "Video file is too large (>50MB): 60000000 bytes",
                FailureStage::Download
            ),
            FailureReply::EditStatus(
                "❌ Error processing tiktok link.\nError: Video file is too large (>50MB): 60000000 bytes"
                    .to_string()
            )
        );
        // Login text on a non-Instagram link is just an error
        assert!(matches!(
            failure_reply(
                MediaService::YouTube,
                "https://youtube.com/shorts/x",
                "login required",
                FailureStage::Download
            ),
            FailureReply::EditStatus(text) if text.starts_with("❌ Error processing youtube link.")
        ));
    }
}
