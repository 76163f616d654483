//! Relay UI texts
//!
//! Command replies, status-message stages and failure messages.

use crate::media::MediaService;

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for relay view rendering
///
/// Provides all user-facing texts of the link relay flow.
pub trait RelayView {
    /// Reply to `/start`
    fn start_message() -> &'static str;

    /// Reply to `/help`
    fn help_message() -> &'static str;

    /// Reply to private-chat text that is not a supported link
    fn invalid_link() -> &'static str;

    /// First status stage, right after the link was recognized
    fn processing(service: MediaService) -> String;

    /// Status while the backend is downloading
    fn downloading(service: MediaService) -> &'static str;

    /// Status while the file is being sent to Telegram
    fn uploading() -> &'static str;

    /// Twitter download failed: offer a viewer link instead
    fn twitter_no_media(fixed_url: &str) -> String;

    /// Twitter upload failed: offer a viewer link instead
    fn twitter_failed(fixed_url: &str) -> String;

    /// Instagram asked for a login
    fn instagram_login_required() -> &'static str;

    /// Any other failure
    fn processing_error(service: MediaService, error: &str) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English-language implementation of `RelayView`
pub struct DefaultRelayView;

impl RelayView for DefaultRelayView {
    fn start_message() -> &'static str {
        "👋 Hi! I can help you download content from social media.\n\n\
         Just send me a link from:\n\
         • Instagram Reels\n\
         • TikTok Videos\n\
         • YouTube Shorts\n\
         • Twitter Media\n\n\
         And I'll send the media back to you!"
    }

    fn help_message() -> &'static str {
        "Just send me a social media link and I'll download it for you!\n\n\
         Supported platforms:\n\
         • Instagram Reels\n\
         • TikTok Videos\n\
         • YouTube Shorts\n\
         • Twitter Media"
    }

    fn invalid_link() -> &'static str {
        "❌ Please send a valid link from supported platforms:\n\
         • Instagram Reels\n\
         • TikTok Videos\n\
         • YouTube Shorts\n\
         • Twitter Media"
    }

    fn processing(service: MediaService) -> String {
        format!("⏳ Processing {service} link...")
    }

    fn downloading(service: MediaService) -> &'static str {
        match service {
            MediaService::YouTube => "📥 Downloading YouTube video...",
            MediaService::TikTok => "📥 Downloading TikTok video...",
            MediaService::Instagram => "📥 Downloading Instagram media...",
            MediaService::Twitter => "📥 Downloading Twitter media...",
            MediaService::Unknown => "📥 Downloading...",
        }
    }

    fn uploading() -> &'static str {
        "📤 Uploading to Telegram..."
    }

    fn twitter_no_media(fixed_url: &str) -> String {
        format!("No downloadable media found. Here's a better link:\n{fixed_url}")
    }

    fn twitter_failed(fixed_url: &str) -> String {
        format!("❌ Couldn't download media. Here's a better link:\n{fixed_url}")
    }

    fn instagram_login_required() -> &'static str {
        "❌ Instagram login required.\n\
         Please contact bot administrator to configure Instagram authentication."
    }

    fn processing_error(service: MediaService, error: &str) -> String {
        format!("❌ Error processing {service} link.\nError: {error}")
    }
}
