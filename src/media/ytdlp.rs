//! `yt-dlp` process wrapper.
//!
//! Runs the `yt-dlp` binary with `-J` so every call, with or without a
//! download, yields one JSON info document on stdout.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::utils::truncate_str;

/// Maximum length of yt-dlp error output carried in errors
const MAX_ERROR_LENGTH: usize = 500;

/// Errors from running `yt-dlp`
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The binary could not be started
    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    /// yt-dlp exited with a non-zero status
    #[error("{message}")]
    Failed {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Most relevant line of stderr
        message: String,
    },
    /// The info document could not be parsed
    #[error("Invalid yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for a single extraction, mirroring the yt-dlp flags the bot uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Format selector (`-f`)
    pub format: Option<String>,
    /// Output template (`-o`)
    pub output_template: Option<String>,
    /// Download size limit in bytes (`--max-filesize`)
    pub max_filesize: Option<u64>,
    /// Read credentials from a netrc file
    pub use_netrc: bool,
    /// netrc file location
    pub netrc_location: Option<PathBuf>,
    /// yt-dlp cache directory
    pub cache_dir: Option<PathBuf>,
    /// Do not resolve playlist entries
    pub extract_flat: bool,
}

impl ExtractOptions {
    /// Options shared by every download: best mp4, size limit, temp file
    /// named `<extractor>_<id>.<ext>` inside `download_dir`.
    #[must_use]
    pub fn base(download_dir: &Path, max_filesize: u64) -> Self {
        Self {
            format: Some("best[ext=mp4]".to_string()),
            output_template: Some(
                download_dir
                    .join("%(extractor)s_%(id)s.%(ext)s")
                    .to_string_lossy()
                    .into_owned(),
            ),
            max_filesize: Some(max_filesize),
            ..Self::default()
        }
    }

    /// Add login credentials (netrc) and a persistent cache directory.
    #[must_use]
    pub fn with_credentials(
        mut self,
        netrc_location: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        self.use_netrc = true;
        self.netrc_location = netrc_location;
        self.cache_dir = cache_dir;
        self
    }

    /// Metadata-only options that skip playlist resolution.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            extract_flat: true,
            ..Self::default()
        }
    }

    /// Build the yt-dlp argument list for `url`.
    #[must_use]
    pub fn to_args(&self, url: &str, download: bool) -> Vec<String> {
        let mut args: Vec<String> = ["--no-warnings", "--no-progress", "-J"]
            .into_iter()
            .map(String::from)
            .collect();

        if download {
            args.push("--no-simulate".to_string());
        }
        if self.extract_flat {
            args.push("--flat-playlist".to_string());
        }
        if let Some(ref format) = self.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }
        if let Some(ref template) = self.output_template {
            args.push("-o".to_string());
            args.push(template.clone());
        }
        if let Some(max) = self.max_filesize {
            args.push("--max-filesize".to_string());
            args.push(max.to_string());
        }
        if self.use_netrc {
            args.push("--netrc".to_string());
            if let Some(ref location) = self.netrc_location {
                args.push("--netrc-location".to_string());
                args.push(location.to_string_lossy().into_owned());
            }
        }
        if let Some(ref dir) = self.cache_dir {
            args.push("--cache-dir".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

/// The part of yt-dlp's info document the bot reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    /// Video title
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration: Option<f64>,
    /// Uploader display name or handle
    #[serde(default)]
    pub uploader: Option<String>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Declared file size in bytes
    #[serde(default, deserialize_with = "lenient_number")]
    pub filesize: Option<f64>,
    /// Final path after post-processing
    #[serde(default)]
    pub filepath: Option<String>,
    /// Path built from the output template
    #[serde(default)]
    pub filename: Option<String>,
    /// Legacy name of `filename`
    #[serde(default, rename = "_filename")]
    pub legacy_filename: Option<String>,
}

impl VideoInfo {
    /// Path of the downloaded file, as reported by yt-dlp
    #[must_use]
    pub fn output_path(&self) -> Option<PathBuf> {
        self.filepath
            .as_deref()
            .or(self.filename.as_deref())
            .or(self.legacy_filename.as_deref())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

/// Read a number that may arrive as a JSON number or a numeric string.
///
/// Anything else (including NaN and infinities) is treated as absent.
#[must_use]
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Pick the line of yt-dlp's stderr worth showing to a user.
///
/// Prefers the last `ERROR:` line, falling back to the whole (truncated) output.
#[must_use]
pub fn error_summary(stderr: &str) -> String {
    let summary = stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .unwrap_or_else(|| stderr.trim());

    if summary.is_empty() {
        return "yt-dlp exited without output".to_string();
    }
    truncate_str(summary, MAX_ERROR_LENGTH)
}

/// Source of video metadata and downloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Extract the info document for `url`, downloading the media when
    /// `download` is true.
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
        download: bool,
    ) -> Result<VideoInfo, ExtractorError>;
}

/// [`MediaExtractor`] backed by the `yt-dlp` executable
pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    /// Create an extractor that runs `binary` (a name on `PATH` or a full path)
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
        download: bool,
    ) -> Result<VideoInfo, ExtractorError> {
        let args = options.to_args(url, download);
        debug!(binary = %self.binary, ?args, "Executing yt-dlp command");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = error_summary(&stderr);
            warn!(url = %url, code = ?output.status.code(), error = %message, "yt-dlp failed");
            return Err(ExtractorError::Failed {
                code: output.status.code(),
                message,
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
