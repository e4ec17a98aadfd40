//! Durable warm-start storage for the aggregate snapshot.
//!
//! The warm cache holds one serialized `AppSnapshot` per application key plus
//! the time it was written. It is read to answer loads without a network round
//! trip and written only when a fresh aggregate arrives from the store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::AppSnapshot;

/// Synchronous key-value storage for warm snapshots.
pub trait WarmCache: Send + Sync {
    fn read(&self, app_key: &str) -> Result<Option<String>>;

    fn write(&self, app_key: &str, blob: &str) -> Result<()>;

    fn read_timestamp(&self, app_key: &str) -> Result<Option<DateTime<Utc>>>;

    fn write_timestamp(&self, app_key: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Read and parse the warm snapshot for `app_key`.
///
/// Missing, outdated, unreadable or corrupt snapshots all yield `None`; the
/// caller then falls through to the persistent store.
pub fn load_snapshot(cache: &dyn WarmCache, app_key: &str, max_age: Duration) -> Option<AppSnapshot> {
    let written_at = match cache.read_timestamp(app_key) {
        Ok(Some(at)) => at,
        Ok(None) => {
            debug!(app_key, "No warm snapshot timestamp");
            return None;
        }
        Err(e) => {
            warn!(app_key, error = %e, "Failed to read warm snapshot timestamp");
            return None;
        }
    };

    let age = Utc::now() - written_at;
    if age.to_std().map_or(false, |age| age > max_age) {
        debug!(app_key, age_minutes = age.num_minutes(), "Warm snapshot too old, ignoring");
        return None;
    }

    let blob = match cache.read(app_key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(e) => {
            warn!(app_key, error = %e, "Failed to read warm snapshot");
            return None;
        }
    };

    match serde_json::from_str(&blob) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(app_key, error = %e, "Corrupt warm snapshot, ignoring");
            None
        }
    }
}

/// Serialize `snapshot` and record the write time.
pub fn store_snapshot(cache: &dyn WarmCache, app_key: &str, snapshot: &AppSnapshot) -> Result<()> {
    let blob = serde_json::to_string(snapshot).context("Failed to serialize warm snapshot")?;
    cache.write(app_key, &blob)?;
    cache.write_timestamp(app_key, Utc::now())?;
    Ok(())
}

/// Warm cache backed by JSON files in a cache directory.
pub struct FileWarmCache {
    cache_dir: PathBuf,
}

impl FileWarmCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn snapshot_path(&self, app_key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", app_key))
    }

    fn timestamp_path(&self, app_key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.synced_at", app_key))
    }

    fn read_optional(path: &PathBuf) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
        Ok(Some(contents))
    }

    /// Write to a sibling temp file, then rename over the target.
    fn write_atomic(path: &PathBuf, contents: &str) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
        Ok(())
    }
}

impl WarmCache for FileWarmCache {
    fn read(&self, app_key: &str) -> Result<Option<String>> {
        Self::read_optional(&self.snapshot_path(app_key))
    }

    fn write(&self, app_key: &str, blob: &str) -> Result<()> {
        Self::write_atomic(&self.snapshot_path(app_key), blob)
    }

    fn read_timestamp(&self, app_key: &str) -> Result<Option<DateTime<Utc>>> {
        match Self::read_optional(&self.timestamp_path(app_key))? {
            Some(raw) => {
                let at = DateTime::parse_from_rfc3339(raw.trim())
                    .with_context(|| format!("Invalid warm snapshot timestamp: {}", raw.trim()))?;
                Ok(Some(at.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    fn write_timestamp(&self, app_key: &str, at: DateTime<Utc>) -> Result<()> {
        Self::write_atomic(&self.timestamp_path(app_key), &at.to_rfc3339())
    }
}

/// In-process warm cache, for tests and for embedders without durable storage.
#[derive(Default)]
pub struct MemoryWarmCache {
    blobs: Mutex<HashMap<String, String>>,
    timestamps: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryWarmCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarmCache for MemoryWarmCache {
    fn read(&self, app_key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| anyhow::anyhow!("warm cache lock poisoned"))?;
        Ok(blobs.get(app_key).cloned())
    }

    fn write(&self, app_key: &str, blob: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().map_err(|_| anyhow::anyhow!("warm cache lock poisoned"))?;
        blobs.insert(app_key.to_string(), blob.to_string());
        Ok(())
    }

    fn read_timestamp(&self, app_key: &str) -> Result<Option<DateTime<Utc>>> {
        let timestamps = self
            .timestamps
            .lock()
            .map_err(|_| anyhow::anyhow!("warm cache lock poisoned"))?;
        Ok(timestamps.get(app_key).copied())
    }

    fn write_timestamp(&self, app_key: &str, at: DateTime<Utc>) -> Result<()> {
        let mut timestamps = self
            .timestamps
            .lock()
            .map_err(|_| anyhow::anyhow!("warm cache lock poisoned"))?;
        timestamps.insert(app_key.to_string(), at);
        Ok(())
    }
}
