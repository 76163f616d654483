//! Bot runtime: wiring of the downloader, Telegram client and dispatcher.

use crate::bot;
use crate::bot::handlers::Command;
use crate::config::{Settings, TELEGRAM_READ_TIMEOUT_SECS, TELEGRAM_REQUEST_TIMEOUT_SECS};
use crate::media::MediaDownloader;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the bot until Ctrl+C, then release the resolver client.
pub async fn run_bot(settings: Arc<Settings>) {
    let downloader = init_downloader(&settings);
    let bot = init_bot(&settings);
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![downloader.clone(), settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    downloader.close().await;
    info!("Bot stopped.");
}

fn init_downloader(settings: &Settings) -> Arc<MediaDownloader> {
    match MediaDownloader::new(settings) {
        Ok(downloader) => {
            info!(
                cobalt = %settings.cobalt_base_url,
                download_dir = %settings.download_dir().display(),
                "Media downloader initialized."
            );
            Arc::new(downloader)
        }
        Err(e) => {
            error!("Failed to initialize media downloader: {}", e);
            std::process::exit(1);
        }
    }
}

/// Telegram client shared by every API call: 120 s total and 60 s read
/// timeouts, no connect timeout
fn init_bot(settings: &Settings) -> Bot {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(TELEGRAM_REQUEST_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(TELEGRAM_READ_TIMEOUT_SECS))
        .tcp_nodelay(true)
        .build();

    match client {
        Ok(client) => Bot::with_client(settings.bot_token.clone(), client),
        Err(e) => {
            error!("Failed to build Telegram HTTP client, using defaults: {}", e);
            Bot::new(settings.bot_token.clone())
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            // Plain text only; unknown /commands are ignored
            dptree::filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                .endpoint(handle_text),
        )
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    downloader: Arc<MediaDownloader>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::handlers::handle_text(bot, msg, downloader)).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}
