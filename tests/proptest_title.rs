use oxide_media_relay::bot::relay::{fixup_twitter_url, format_duration};
use oxide_media_relay::media::classify;
use oxide_media_relay::media::title::sanitize_title;
use proptest::prelude::*;

fn only_allowed_chars(title: &str) -> bool {
    lazy_regex::regex_is_match!(r"^[\w\s,.!?-]*$", title)
}

proptest! {
    /// Sanitized titles are never empty, never longer than 64 characters and
    /// contain only allowed characters.
    #[test]
    fn sanitized_title_invariants(s in "\\PC*") {
        let title = sanitize_title(&s);

        prop_assert!(!title.is_empty());
        prop_assert!(title.chars().count() <= 64, "too long: {}", title);
        prop_assert!(only_allowed_chars(&title), "bad char in {:?}", title);
        prop_assert!(!title.contains("  "), "double space in {:?}", title);
        prop_assert!(!title.starts_with(char::is_whitespace));
    }

    /// Short titles made only of allowed words survive unchanged.
    #[test]
    fn clean_titles_are_kept(words in prop::collection::vec("[a-zA-Z0-9]{1,6}", 1..6)) {
        let title = words.join(" ");
        prop_assert_eq!(sanitize_title(&title), title);
    }

    /// Any tweet link rewrites to the viewer host and keeps its path.
    #[test]
    fn tweet_links_rewrite_to_fixupx(
        scheme in "(https://|http://|)",
        host in "(www\\.)?(twitter|x)\\.com",
        user in "[A-Za-z0-9_]{1,15}",
        id in "[0-9]{1,19}",
    ) {
        let url = format!("{scheme}{host}/{user}/status/{id}");
        prop_assert_eq!(classify(&url), Some(oxide_media_relay::media::MediaService::Twitter));
        prop_assert_eq!(
            fixup_twitter_url(&url),
            format!("{scheme}fixupx.com/{user}/status/{id}")
        );
    }

    /// Positive durations always render as minutes and two-digit seconds.
    #[test]
    fn durations_render_as_minutes_seconds(seconds in 1.0f64..1_000_000.0) {
        let formatted = format_duration(seconds);
        prop_assert!(formatted.is_some());
        let formatted = formatted.unwrap_or_default();
        let (minutes, secs) = formatted.split_once(':').unwrap_or_default();
        prop_assert_eq!(secs.len(), 2);
        prop_assert!(secs.parse::<u64>().is_ok_and(|s| s < 60));
        prop_assert!(minutes.parse::<u64>().is_ok());
    }
}
