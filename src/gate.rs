//! Cache gate in front of the upstream fetcher
//!
//! Every request goes through [`CacheGate::handle_request`]. A slot stored less
//! than the freshness window ago is served as a hit without any outbound call,
//! which bounds upstream traffic to one call per window. Otherwise the gate
//! fetches, stores the new payload and serves it as a miss.
//!
//! There is no locking around the slot: two requests missing at the same time
//! both fetch, and the later write wins.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::cache::{CacheEntry, CacheStore, FileCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::upstream::{FetchError, LastfmClient, Payload, RecentTracksQuery, UpstreamFetcher};

/// Key injected into every response with the cache outcome
pub const CACHE_STATUS_KEY: &str = "cache_status";

/// Key injected into every response with the expiry as unix seconds
pub const CACHE_EXPIRES_KEY: &str = "cache_expires";

/// Whether a response was served from the cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// The upstream payload plus the two cache annotations
///
/// Serializes as a single flat JSON object. Payload keys that collide with
/// `cache_status` or `cache_expires` are replaced by the annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub payload: Payload,
    pub cache_status: CacheStatus,
    pub cache_expires: DateTime<Utc>,
}

impl ResponseEnvelope {
    pub fn new(payload: Payload, cache_status: CacheStatus, cache_expires: DateTime<Utc>) -> Self {
        Self {
            payload,
            cache_status,
            cache_expires,
        }
    }

}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.payload {
            if key != CACHE_STATUS_KEY && key != CACHE_EXPIRES_KEY {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(CACHE_STATUS_KEY, &self.cache_status)?;
        map.serialize_entry(CACHE_EXPIRES_KEY, &self.cache_expires.timestamp())?;
        map.end()
    }
}

/// Decides per request between the cache slot and the upstream
pub struct CacheGate {
    fetcher: Arc<dyn UpstreamFetcher>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    query: RecentTracksQuery,
    /// Freshness window
    ttl: Duration,
}

impl CacheGate {
    /// Creates a gate on the system clock
    pub fn new(
        fetcher: Arc<dyn UpstreamFetcher>,
        store: Arc<dyn CacheStore>,
        query: RecentTracksQuery,
        ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock: Arc::new(SystemClock),
            query,
            ttl,
        }
    }

    /// Wires the production gate: Last.fm upstream, file store, system clock
    pub fn from_config(config: &Config) -> Self {
        let fetcher = LastfmClient::new(&config.credentials.api_key).with_base_url(&config.api_url);
        let store = FileCacheStore::with_dir(&config.cache_dir);
        Self::new(
            Arc::new(fetcher),
            Arc::new(store),
            config.query(),
            config.cache_duration(),
        )
    }

    /// Replaces the clock used for freshness checks and timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serves the query from the cache slot or from upstream
    ///
    /// # Returns
    /// * `Ok(ResponseEnvelope)` tagged `hit` or `miss`
    /// * `Err(FetchError)` if a miss could not be fetched; the slot is left as it was
    pub async fn handle_request(&self) -> Result<ResponseEnvelope, FetchError> {
        let key = self.query.cache_key();
        let now = self.clock.now();

        if let Some(entry) = self.store.get(&key) {
            match entry.expires_at(self.ttl) {
                Some(expires) if entry.is_fresh(now, self.ttl) => {
                    tracing::debug!(key = %key, expires = expires.timestamp(), "Cache HIT");
                    return Ok(ResponseEnvelope::new(entry.payload, CacheStatus::Hit, expires));
                }
                None => {
                    tracing::warn!(
                        key = %key,
                        stored_at = %entry.stored_at,
                        "Ignoring cache entry with out-of-range timestamp"
                    );
                }
                Some(_) => {}
            }
        }

        tracing::debug!(key = %key, "Cache MISS");
        let payload = self.fetcher.fetch(&self.query).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Upstream fetch failed");
            e
        })?;

        let entry = CacheEntry::new(payload, self.clock.now());
        if let Err(e) = self.store.set(&key, &entry) {
            tracing::warn!(key = %key, error = %e, "Failed to persist cache entry");
        }

        let expires = entry.expires_at(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        tracing::info!(key = %key, expires = expires.timestamp(), "Refreshed recent tracks");
        Ok(ResponseEnvelope::new(entry.payload, CacheStatus::Miss, expires))
    }
}
