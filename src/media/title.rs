//! Caption title sanitization.

// lazy_regex! statics use once_cell internally
#![allow(clippy::non_std_lazy_statics)]

use crate::config::MAX_TITLE_LENGTH;
use crate::utils::truncate_str;
use lazy_regex::lazy_regex;
use regex::Regex;

/// Anything that is not a word character, whitespace or `,.!?-`
static RE_DISALLOWED: lazy_regex::Lazy<Regex> = lazy_regex!(r"[^\w\s,.!?-]");

static RE_WHITESPACE: lazy_regex::Lazy<Regex> = lazy_regex!(r"\s+");

/// Title used when nothing printable is left
pub const FALLBACK_TITLE: &str = "video";

/// Clean a backend-provided title for use in a caption.
///
/// Strips characters outside `[\w\s,.!?-]`, collapses whitespace, trims and
/// truncates to 64 characters. Returns `"video"` if nothing is left.
///
/// # Examples
///
/// ```
/// use oxide_media_relay::media::title::sanitize_title;
///
/// assert_eq!(sanitize_title("Amazing!! Video???  (full) #1"), "Amazing!! Video??? full 1");
/// assert_eq!(sanitize_title("🔥🔥🔥"), "video");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let stripped = RE_DISALLOWED.replace_all(title, "");
    let collapsed = RE_WHITESPACE.replace_all(&stripped, " ");
    let clean = collapsed.trim();

    if clean.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    truncate_str(clean, MAX_TITLE_LENGTH)
}
