//! Cobalt resolver API client.
//!
//! Cobalt turns a public post URL into a direct media URL. One request is
//! made per link: `POST <base_url>` with `{"url": ..., "downloadMode": "auto"}`.
//! The reply is one of three shapes, selected by its `status` field:
//!
//! - `redirect`: a direct `url` and optional `filename`
//! - `picker`: several items, the first video or photo one is used
//! - `error`: an error `code` with optional `context`

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::get_resolver_http_timeout_secs;
use crate::utils::truncate_str;

/// Filename used when a `redirect` reply has none
pub const DEFAULT_REDIRECT_FILENAME: &str = "video.mp4";
/// Filename used when a `picker` reply has none
pub const DEFAULT_PICKER_FILENAME: &str = "media.mp4";

/// Maximum length of a response body kept in logs and errors
const MAX_LOGGED_BODY: usize = 1000;

/// Errors from the resolver client
#[derive(Debug, Error)]
pub enum ResolverError {
    /// No API key was configured
    #[error("COBALT_API_KEY environment variable is required")]
    MissingApiKey,
    /// The API key cannot be sent as a header value
    #[error("Invalid Cobalt API key: {0}")]
    InvalidApiKey(String),
    /// [`CobaltClient::close`] was called
    #[error("Cobalt client is closed")]
    Closed,
    /// Network or protocol failure
    #[error("Error making request to Cobalt API: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx HTTP status
    #[error("Cobalt API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },
    /// The body is not valid JSON or does not fit its declared shape
    #[error("Unexpected Cobalt API response format: {0}")]
    Malformed(String),
    /// Cobalt answered with `status: "error"`
    #[error("Cobalt API error: {code} Context: {context:?}")]
    Remote {
        /// Cobalt error code, e.g. `error.api.link.invalid`
        code: String,
        /// Extra error details
        context: Option<Value>,
    },
    /// A picker reply had no video or photo item
    #[error("No suitable media found in picker response")]
    NoSuitableMedia,
    /// `status` missing or not one of the known values
    #[error("Unexpected Cobalt API response: {0}")]
    UnexpectedResponse(String),
}

/// A direct media URL and the filename to store it under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Direct download URL
    pub url: String,
    /// Suggested filename
    pub filename: String,
}

/// One entry of a `picker` reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PickerItem {
    /// `video`, `photo` or `gif`
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Direct URL of this item
    #[serde(default)]
    pub url: Option<String>,
}

impl PickerItem {
    fn is_media(&self) -> bool {
        matches!(self.kind.as_deref(), Some("video" | "photo"))
    }
}

/// Payload of an `error` reply
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteError {
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Extra error details
    #[serde(default)]
    pub context: Option<Value>,
}

/// A parsed Cobalt reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolverResponse {
    /// Direct link to a single media file
    Redirect {
        /// Direct download URL
        url: String,
        /// Suggested filename
        #[serde(default)]
        filename: Option<String>,
    },
    /// Several media items to choose from
    Picker {
        /// Items in the order Cobalt listed them
        #[serde(default, rename = "picker")]
        items: Vec<PickerItem>,
        /// Suggested filename
        #[serde(default)]
        filename: Option<String>,
    },
    /// Cobalt refused the link
    Error {
        /// Error details
        #[serde(default)]
        error: RemoteError,
    },
    /// Any other `status` value, kept for logging
    #[serde(skip)]
    Unrecognized(Value),
}

impl ResolverResponse {
    /// Classify a JSON reply by its `status` field.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Malformed`] if a known status is missing
    /// required fields (a `redirect` without `url`).
    pub fn from_value(value: Value) -> Result<Self, ResolverError> {
        match value.get("status").and_then(Value::as_str) {
            Some("redirect" | "picker" | "error") => {
                serde_json::from_value(value).map_err(|e| ResolverError::Malformed(e.to_string()))
            }
            _ => Ok(Self::Unrecognized(value)),
        }
    }

    /// Reduce the reply to a single downloadable item.
    ///
    /// # Errors
    ///
    /// Returns an error for `error` replies, pickers without a usable
    /// item and unrecognized replies.
    pub fn into_media(self) -> Result<ResolvedMedia, ResolverError> {
        match self {
            Self::Redirect { url, filename } => Ok(ResolvedMedia {
                url,
                filename: filename.unwrap_or_else(|| DEFAULT_REDIRECT_FILENAME.to_string()),
            }),
            Self::Picker { items, filename } => {
                let item = items
                    .into_iter()
                    .find(PickerItem::is_media)
                    .ok_or(ResolverError::NoSuitableMedia)?;
                let url = item
                    .url
                    .ok_or_else(|| ResolverError::Malformed("picker item has no url".to_string()))?;
                Ok(ResolvedMedia {
                    url,
                    filename: filename.unwrap_or_else(|| DEFAULT_PICKER_FILENAME.to_string()),
                })
            }
            Self::Error { error } => Err(ResolverError::Remote {
                code: error.code.unwrap_or_else(|| "unknown".to_string()),
                context: error.context,
            }),
            Self::Unrecognized(payload) => Err(ResolverError::UnexpectedResponse(truncate_str(
                payload.to_string(),
                MAX_LOGGED_BODY,
            ))),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    url: &'a str,
    download_mode: &'a str,
}

/// Client for a Cobalt instance.
///
/// Holds one pooled HTTP client with the API key attached. After
/// [`close`](Self::close) every request fails with [`ResolverError::Closed`].
pub struct CobaltClient {
    base_url: String,
    http: RwLock<Option<HttpClient>>,
}

impl CobaltClient {
    /// Create a client for the instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::MissingApiKey`] if `api_key` is absent or blank,
    /// or an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, ResolverError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ResolverError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Api-Key {api_key}"))
            .map_err(|e| ResolverError::InvalidApiKey(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(get_resolver_http_timeout_secs()))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, "Cobalt client initialized");

        Ok(Self {
            base_url,
            http: RwLock::new(Some(http)),
        })
    }

    /// Base URL with trailing slashes removed
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `url` to a single downloadable item.
    ///
    /// `video_quality` is accepted for API compatibility; the request always
    /// lets Cobalt pick (`downloadMode: auto`).
    ///
    /// # Errors
    ///
    /// Returns a [`ResolverError`] describing why no media could be resolved.
    pub async fn try_resolve(
        &self,
        url: &str,
        video_quality: &str,
    ) -> Result<ResolvedMedia, ResolverError> {
        let http = self.http.read().await.clone().ok_or(ResolverError::Closed)?;

        debug!(url = %url, video_quality = %video_quality, "Resolving media via Cobalt");

        let response = http
            .post(&self.base_url)
            .json(&ResolveRequest {
                url,
                download_mode: "auto",
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, body = %truncate_str(&body, MAX_LOGGED_BODY), "Cobalt API response");

        if !status.is_success() {
            return Err(ResolverError::Status {
                status: status.as_u16(),
                body: truncate_str(&body, MAX_LOGGED_BODY),
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| ResolverError::Malformed(e.to_string()))?;
        ResolverResponse::from_value(value)?.into_media()
    }

    /// Like [`try_resolve`](Self::try_resolve), but logs the failure and
    /// returns `None`.
    pub async fn resolve(&self, url: &str, video_quality: &str) -> Option<ResolvedMedia> {
        match self.try_resolve(url, video_quality).await {
            Ok(media) => {
                debug!(url = %url, media_url = %media.url, filename = %media.filename, "Cobalt resolved media");
                Some(media)
            }
            Err(e) => {
                error!(url = %url, error = %e, "Failed to resolve media via Cobalt");
                None
            }
        }
    }

    /// Release the HTTP client. Safe to call more than once.
    pub async fn close(&self) {
        if self.http.write().await.take().is_some() {
            info!("Cobalt client closed");
        }
    }

    /// Whether [`close`](Self::close) has been called
    pub async fn is_closed(&self) -> bool {
        self.http.read().await.is_none()
    }
}
