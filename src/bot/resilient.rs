//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Status messages are small and idempotent enough to retry on transient
//! network failures using exponential backoff with jitter. Video uploads are
//! not retried.
//!
//! # Usage
//!
//! ```ignore
//! use oxide_media_relay::bot::resilient::{reply_resilient, edit_status_resilient};
//!
//! let status = reply_resilient(&bot, &msg, "⏳ Processing...").await?;
//! let updated = edit_status_resilient(&bot, &status, "📤 Uploading...").await;
//! ```

use crate::utils::retry_telegram_operation_if;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{Message, ReplyParameters};
use teloxide::RequestError;
use tracing::{debug, warn};

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "message to edit not found";

/// Reply to `msg` with plain text, retrying on network failures.
///
/// A send that timed out is not repeated: Telegram may already have posted
/// it, and a retry would show the status twice.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn reply_resilient(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<Message> {
    let text = text.into();
    retry_telegram_operation_if(
        || async {
            bot.send_message(msg.chat.id, text.clone())
                .reply_parameters(ReplyParameters::new(msg.id))
                .await
        },
        |e: &RequestError| !may_have_been_delivered(e),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
}

/// Replace the text of a status message, retrying on network failures.
///
/// "Not modified" and "not found" answers are expected (the status may already
/// show this text or have been removed). They are not retried and only logged
/// at debug level.
///
/// # Returns
///
/// - `true` if the message was edited
/// - `false` if the edit was skipped or failed after retries
pub async fn edit_status_resilient(bot: &Bot, status: &Message, text: &str) -> bool {
    let result = retry_telegram_operation_if(
        || async { bot.edit_message_text(status.chat.id, status.id, text).await },
        |e: &RequestError| !is_expected_edit_error(&e.to_string()),
    )
    .await;

    match result {
        Ok(_) => true,
        Err(e) => {
            let err_msg = e.to_string();
            if is_expected_edit_error(&err_msg) {
                debug!("Status update skipped: {err_msg}");
            } else {
                warn!("Failed to edit status message after retries: {e}");
            }
            false
        }
    }
}

/// Remove a status message. Failures are logged and ignored.
pub async fn delete_status(bot: &Bot, status: &Message) {
    if let Err(e) = bot.delete_message(status.chat.id, status.id).await {
        warn!(chat_id = %status.chat.id, error = %e, "Failed to delete status message");
    }
}

fn is_expected_edit_error(err_msg: &str) -> bool {
    err_msg.contains(ERROR_NOT_MODIFIED) || err_msg.contains(ERROR_NOT_FOUND)
}

fn may_have_been_delivered(e: &RequestError) -> bool {
    matches!(e, RequestError::Network(e) if e.is_timeout())
}
