//! File-backed cache store
//!
//! Each slot is a pretty-printed JSON file named after its key inside a single
//! cache directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{CacheEntry, CacheStore};

/// Persists cache slots as JSON files in a directory
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the slot, so a concurrent reader sees either the previous entry or the
/// new one. The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileCacheStore {
    /// Creates a store rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }
}

impl CacheStore for FileCacheStore {
    /// Reads a slot from disk
    ///
    /// A missing file is a silent `None`. An unreadable or unparsable file is
    /// logged and also reported as `None`, so the next request refetches and
    /// overwrites it.
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.cache_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt cache file");
                None
            }
        }
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> io::Result<()> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.cache_path(key))?;
        Ok(())
    }
}
