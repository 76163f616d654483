//! Link classification.
//!
//! Each supported service has one prefix-anchored pattern. Only the start of
//! the text has to look like a link: anything after a match is ignored, so
//! `https://youtu.be/abc and more text` is still a YouTube link.

// lazy_regex! statics use once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use super::MediaService;
use lazy_regex::lazy_regex;
use regex::Regex;

static RE_INSTAGRAM: lazy_regex::Lazy<Regex> =
    lazy_regex!(r"^(?:https?://)?(?:www\.)?instagram\.com(?:/[^/]+)?/(?:p|reel)/([^/?#&]+)");

static RE_TIKTOK: lazy_regex::Lazy<Regex> =
    lazy_regex!(r"^(?:https?://)?(?:www\.|vm\.|vt\.)?tiktok\.com/(?:@[\w.-]+/video/\d+|[\w.-]+)");

static RE_YOUTUBE: lazy_regex::Lazy<Regex> = lazy_regex!(
    r"^(?:https?://)?(?:www\.)?(?:youtube\.com/(?:shorts/|watch\?v=)|youtu\.be/)([a-zA-Z0-9_-]+)"
);

static RE_TWITTER: lazy_regex::Lazy<Regex> =
    lazy_regex!(r"^(?:https?://)?(?:www\.)?(?:twitter\.com|x\.com)/(?:\w+)/status/(\d+)");

/// Services in the order their patterns are tried
const CLASSIFY_ORDER: [MediaService; 4] = [
    MediaService::Instagram,
    MediaService::TikTok,
    MediaService::YouTube,
    MediaService::Twitter,
];

/// Pattern registered for a service, if any
#[must_use]
pub fn pattern(service: MediaService) -> Option<&'static Regex> {
    match service {
        MediaService::Instagram => Some(&*RE_INSTAGRAM),
        MediaService::TikTok => Some(&*RE_TIKTOK),
        MediaService::YouTube => Some(&*RE_YOUTUBE),
        MediaService::Twitter => Some(&*RE_TWITTER),
        MediaService::Unknown => None,
    }
}

/// Returns the first service whose pattern matches the start of `text`.
///
/// # Examples
///
/// ```
/// use oxide_media_relay::media::{classify, MediaService};
///
/// assert_eq!(classify("https://x.com/rustlang/status/1"), Some(MediaService::Twitter));
/// assert_eq!(classify("hello"), None);
/// ```
#[must_use]
pub fn classify(text: &str) -> Option<MediaService> {
    CLASSIFY_ORDER
        .into_iter()
        .find(|service| pattern(*service).is_some_and(|re| re.is_match(text)))
}

/// Validate a link and identify its service.
///
/// Returns `(true, Some(service))` on a match and `(false, None)` otherwise.
#[must_use]
pub fn validate_url(text: &str) -> (bool, Option<MediaService>) {
    let service = classify(text);
    (service.is_some(), service)
}

/// Extract the post/video id captured by a service's pattern.
///
/// Returns `None` if the service has no pattern, the pattern does not match,
/// or it has no capture group (TikTok).
#[must_use]
pub fn extract_media_id(url: &str, service: MediaService) -> Option<String> {
    pattern(service)?
        .captures(url)?
        .get(1)
        .map(|m| m.as_str().to_string())
}
