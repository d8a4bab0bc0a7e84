//! Cache module for storing upstream responses
//!
//! A cache slot holds the most recent successful upstream payload together with
//! the time it was stored. Slots are addressed by a key derived from the upstream
//! query and are only ever replaced wholesale, never patched in place.
//!
//! Two stores are provided: [`FileCacheStore`] persists each slot as a JSON file,
//! [`MemoryCacheStore`] keeps them in process memory.

mod file;
mod memory;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::upstream::Payload;

/// A stored upstream payload and the moment it was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The upstream JSON object, without any cache annotations
    pub payload: Payload,
    /// When the payload was stored; the freshness clock starts here
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: Payload, stored_at: DateTime<Utc>) -> Self {
        Self { payload, stored_at }
    }

    /// Absolute time at which this entry stops being served
    ///
    /// `None` when `stored_at + ttl` is out of range, which only a corrupt slot
    /// can produce; such an entry is never fresh.
    pub fn expires_at(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        self.stored_at.checked_add_signed(ttl)
    }

    /// Whether the entry may still be served at `now`.
    ///
    /// Strictly less than: an entry read exactly `ttl` after it was stored is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.expires_at(ttl).is_some() && now - self.stored_at < ttl
    }
}

/// Storage for cache slots
///
/// `get` returns `None` both for a missing slot and for one that cannot be read
/// back; callers treat either as a miss. `set` replaces the whole slot.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn set(&self, key: &str, entry: &CacheEntry) -> std::io::Result<()>;
}
