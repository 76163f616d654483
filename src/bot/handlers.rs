use crate::bot::relay::relay_link;
use crate::bot::views::{DefaultRelayView, RelayView};
use crate::media::{classify, MediaDownloader};
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, types::ReplyParameters, utils::command::BotCommands};
use tracing::{debug, info};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage help
    #[command(description = "Show supported platforms.")]
    Help,
}

/// The link at the start of a message, without any trailing text
#[must_use]
pub fn leading_link(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Start handler. Answers in private chats only.
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    reply_private(&bot, &msg, DefaultRelayView::start_message(), "/start").await
}

/// Help handler. Answers in private chats only.
///
/// # Errors
///
/// Returns an error if the help message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    reply_private(&bot, &msg, DefaultRelayView::help_message(), "/help").await
}

async fn reply_private(bot: &Bot, msg: &Message, text: &str, command: &str) -> Result<()> {
    let user_id = get_user_id_safe(msg);
    if !msg.chat.is_private() {
        debug!("Ignoring {command} from user {user_id} outside a private chat");
        return Ok(());
    }

    info!("User {user_id} issued {command}.");
    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Text handler: relay supported links, reject anything else in private chats.
///
/// # Errors
///
/// Returns an error if a reply cannot be sent.
pub async fn handle_text(bot: Bot, msg: Message, downloader: Arc<MediaDownloader>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match (classify(text), leading_link(text)) {
        (Some(service), Some(url)) => relay_link(&bot, &msg, service, url, &downloader).await,
        _ => {
            if msg.chat.is_private() {
                bot.send_message(msg.chat.id, DefaultRelayView::invalid_link())
                    .reply_parameters(ReplyParameters::new(msg.id))
                    .await?;
            }
            Ok(())
        }
    }
}
