//! Utility functions for string truncation and Telegram API retries.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use oxide_media_relay::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for status-message sends and edits, which may fail due to transient
/// network errors.
///
/// The retry strategy uses exponential backoff with jitter:
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (see constants in `config.rs`)
///
/// # Examples
///
/// ```no_run
/// use oxide_media_relay::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn edit_status() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { edit_status().await }).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    retry_telegram_operation_if(operation, |_: &anyhow::Error| true).await
}

/// Retry a Telegram API operation while `should_retry` accepts its error.
///
/// Same backoff as [`retry_telegram_operation`]. An error rejected by
/// `should_retry` is returned at once.
///
/// # Errors
///
/// Returns the first rejected error, or the last error if all attempts fail.
pub async fn retry_telegram_operation_if<F, Fut, T, E, C>(
    operation: F,
    should_retry: C,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
    C: FnMut(&E) -> bool,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, should_retry)
        .await
        .map_err(|e| {
            warn!("Telegram API operation failed: {}", e);
            e
        })
}
