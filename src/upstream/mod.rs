//! Upstream recent-tracks source
//!
//! The cache gate talks to the upstream API through [`UpstreamFetcher`], which
//! performs one outbound call per invocation and hands back the decoded JSON
//! object. [`LastfmClient`] is the production implementation.

pub mod lastfm;

pub use lastfm::{LastfmClient, LASTFM_API_URL};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// A decoded upstream JSON object
pub type Payload = serde_json::Map<String, Value>;

/// Default Last.fm user whose tracks are proxied
pub const DEFAULT_USER: &str = "misaliba";

/// Default number of recent tracks requested
pub const DEFAULT_LIMIT: u32 = 1;

/// Errors that can occur when fetching from upstream
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    /// The request URL is stripped because its query carries the API key.
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {0}")]
    Status(StatusCode),

    /// The body was empty, not JSON, or not a JSON object
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Wraps a reqwest error without the request URL
    pub fn transport(err: reqwest::Error) -> Self {
        FetchError::Transport(err.without_url())
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }
}

/// The fixed upstream query; one cache slot exists per distinct query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTracksQuery {
    pub user: String,
    pub limit: u32,
}

impl Default for RecentTracksQuery {
    fn default() -> Self {
        Self {
            user: DEFAULT_USER.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RecentTracksQuery {
    pub fn new(user: impl Into<String>, limit: u32) -> Self {
        Self {
            user: user.into(),
            limit,
        }
    }

    /// Generates the cache key for this query
    ///
    /// Only ASCII alphanumerics, `-` and `_` survive so the key is safe to use
    /// as a file name.
    pub fn cache_key(&self) -> String {
        let user: String = self
            .user
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("lastfm_recenttracks_{}_{}", user, self.limit)
    }
}

/// Performs the outbound call for a query
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Fetches and decodes one upstream response. Never retries.
    async fn fetch(&self, query: &RecentTracksQuery) -> Result<Payload, FetchError>;
}

/// Decodes an upstream body into a JSON object
///
/// Anything other than a JSON object is a decode failure, including an empty
/// body and a bare `null`.
pub fn decode_payload(body: &str) -> Result<Payload, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::Decode("empty response body".to_string()));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FetchError::Decode(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(FetchError::Decode(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
