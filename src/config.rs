//! Configuration and settings management
//!
//! Loads settings from environment variables and defines download and
//! Telegram transport constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,

    /// Base URL of the Cobalt resolver API
    #[serde(default = "default_cobalt_base_url")]
    pub cobalt_base_url: String,
    /// Cobalt API key (required to start the bot)
    pub cobalt_api_key: Option<String>,

    /// netrc file with YouTube login credentials
    pub netrc_location: Option<PathBuf>,
    /// yt-dlp cache directory
    pub cache_dir: Option<PathBuf>,
    /// Directory for temporary media files
    pub download_dir: Option<PathBuf>,
    /// yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
}

fn default_cobalt_base_url() -> String {
    DEFAULT_COBALT_BASE_URL.to_string()
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oxide_media_relay::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg.. `APP_COBALT_BASE_URL=... ./target/app`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain variables: BOT_TOKEN -> bot_token, empty values count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Directory where downloads are written, falling back to the system temp dir
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Default Cobalt endpoint (self-hosted instance)
pub const DEFAULT_COBALT_BASE_URL: &str = "http://localhost:9000/";

/// Largest file the bot will try to relay (Telegram bot upload limit)
pub const MAX_FILE_SIZE_BYTES: u64 = 50_000_000;
/// Maximum caption title length in characters
pub const MAX_TITLE_LENGTH: usize = 64;
/// Preferred video quality passed to the resolver
pub const DEFAULT_VIDEO_QUALITY: &str = "1080";

/// Total timeout for every Telegram request, sized for a 50 MB video upload.
///
/// The same client serves `getUpdates` and status edits, so a stalled call of
/// any kind is only cut off after this long.
pub const TELEGRAM_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Read timeout for Telegram calls
pub const TELEGRAM_READ_TIMEOUT_SECS: u64 = 60;

// Telegram API retry configuration
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum number of Telegram API retries
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Default timeout for resolver and media HTTP requests
pub const RESOLVER_HTTP_TIMEOUT_SECS: u64 = 30;

/// Get resolver HTTP timeout from env or default.
///
/// Environment variable: `RESOLVER_HTTP_TIMEOUT_SECS`.
#[must_use]
pub fn get_resolver_http_timeout_secs() -> u64 {
    std::env::var("RESOLVER_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(RESOLVER_HTTP_TIMEOUT_SECS)
}
