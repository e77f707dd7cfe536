use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::SourceQuery;
use crate::clock::Clock;
use crate::config::CacheConfig;

/// Get the platform-appropriate directory for persisted responses
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("civic-scorecard/responses"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/civic-scorecard/responses",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Remove the persisted response cache
pub fn clear_cache(path: Option<PathBuf>) -> Result<()> {
    let cache_path = path.unwrap_or_else(get_cache_path);
    match std::fs::remove_dir_all(&cache_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

/// Identity of one cached response: the source plus its normalized query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub query: String,
}

impl CacheKey {
    pub fn new(source: &str, query: &SourceQuery) -> Self {
        Self {
            source: source.to_string(),
            query: query.normalized(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.query)
    }
}

/// Raw payload plus the time it was stored
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    payload: serde_json::Value,
    inserted_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub writes: u64,
}

/// Time-to-live cache of raw source responses.
///
/// Entries live in memory, one lock per key, and are optionally written through
/// to disk with cacache. Expired entries are evicted when looked up. When the
/// cache is disabled every lookup misses and writes are dropped.
pub struct ResponseCache {
    enabled: bool,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    slots: RwLock<HashMap<CacheKey, Slot>>,
    disk_path: Option<PathBuf>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    writes: AtomicU64,
}

impl ResponseCache {
    pub fn new(enabled: bool, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled,
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500)),
            clock,
            slots: RwLock::new(HashMap::new()),
            disk_path: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = Self::new(config.enabled, config.ttl(), clock);
        if config.persist {
            cache.with_disk(config.dir.clone().unwrap_or_else(get_cache_path))
        } else {
            cache
        }
    }

    /// Persist entries under `path` in addition to memory
    pub fn with_disk(mut self, path: PathBuf) -> Self {
        self.disk_path = Some(path);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached payload if present and younger than the TTL
    pub fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }

        let now = self.clock.now();
        let slot = self.slots.read().unwrap().get(key).cloned();

        if let Some(slot) = slot {
            let mut entry = slot.lock().unwrap();
            if let Some(cached) = entry.as_ref() {
                if now - cached.inserted_at < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(cached.payload.clone());
                }
                *entry = None;
                self.expired.fetch_add(1, Ordering::Relaxed);
                self.remove_from_disk(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        match self.load_from_disk(key, now) {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry for the key
    pub fn put(&self, key: &CacheKey, payload: serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = CacheEntry {
            payload,
            inserted_at: self.clock.now(),
        };

        // Write to disk (fire-and-forget, the cache is advisory)
        if let Some(ref path) = self.disk_path {
            if let Ok(serialized) = serde_json::to_vec(&entry) {
                if let Err(e) = cacache::write_sync(path, key.to_string(), &serialized) {
                    tracing::debug!(key = %key, error = %e, "failed to persist cache entry");
                }
            }
        }

        *self.slot(key).lock().unwrap() = Some(entry);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop all in-memory entries
    pub fn clear_memory(&self) {
        self.slots.write().unwrap().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .slots
            .read()
            .unwrap()
            .values()
            .filter(|slot| slot.lock().unwrap().is_some())
            .count();

        CacheStats {
            enabled: self.enabled,
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        if let Some(slot) = self.slots.read().unwrap().get(key) {
            return slot.clone();
        }
        self.slots
            .write()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Try to load a fresh entry from disk, populating memory on success
    fn load_from_disk(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<serde_json::Value> {
        let path = self.disk_path.as_ref()?;
        let bytes = cacache::read_sync(path, key.to_string()).ok()?;
        let entry: CacheEntry = serde_json::from_slice(&bytes).ok()?;

        if now - entry.inserted_at >= self.ttl {
            self.expired.fetch_add(1, Ordering::Relaxed);
            self.remove_from_disk(key);
            return None;
        }

        let payload = entry.payload.clone();
        *self.slot(key).lock().unwrap() = Some(entry);
        Some(payload)
    }

    fn remove_from_disk(&self, key: &CacheKey) {
        if let Some(ref path) = self.disk_path {
            let _ = cacache::remove_sync(path, key.to_string());
        }
    }
}
