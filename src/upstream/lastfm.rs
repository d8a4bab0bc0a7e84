//! Last.fm API client
//!
//! Fetches `user.getrecenttracks` from the Last.fm (audioscrobbler) web service.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use super::{decode_payload, FetchError, Payload, RecentTracksQuery, UpstreamFetcher};

/// Base URL for the Last.fm API
pub const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Client for the Last.fm recent tracks method
#[derive(Clone)]
pub struct LastfmClient {
    http_client: Client,
    api_key: String,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl fmt::Debug for LastfmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastfmClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LastfmClient {
    /// Create a new client against the public Last.fm endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: LASTFM_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query_params(&self, query: &RecentTracksQuery) -> Vec<(&'static str, String)> {
        vec![
            ("method", "user.getrecenttracks".to_string()),
            ("user", query.user.clone()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("limit", query.limit.to_string()),
        ]
    }
}

#[async_trait]
impl UpstreamFetcher for LastfmClient {
    async fn fetch(&self, query: &RecentTracksQuery) -> Result<Payload, FetchError> {
        tracing::debug!(user = %query.user, limit = query.limit, "Requesting recent tracks");
        let started = Instant::now();

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        tracing::debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await.map_err(FetchError::transport)?;
        decode_payload(&text)
    }
}
