//! Cache backend trait and the local in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::error::WhitelistResult;

/// Trait for whitelist snapshot cache backends.
///
/// Get/set/delete are independent key-level operations with no cross-key
/// transaction. A failing backend must be survivable: callers degrade to
/// direct store reads.
pub trait CacheBackend: Send + Sync {
    /// Get the cached bytes for a key, if present and unexpired.
    fn get(&self, key: &str) -> WhitelistResult<Option<Vec<u8>>>;

    /// Store bytes under a key with a TTL.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> WhitelistResult<()>;

    /// Delete a key.
    fn delete(&self, key: &str) -> WhitelistResult<()>;

    /// Check if the backend is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

/// Local in-memory cache (for single-instance deployments).
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean up expired entries.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries
            .write()
            .unwrap()
            .retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> WhitelistResult<Option<Vec<u8>>> {
        let entries = self.entries.read().unwrap();

        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.data.clone()));
            }
        }

        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> WhitelistResult<()> {
        let entry = CacheEntry {
            data: value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().unwrap().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> WhitelistResult<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let cache = MemoryCache::new();
        cache
            .set("k1", b"snapshot".to_vec(), Duration::from_secs(60))
            .unwrap();

        assert_eq!(cache.get("k1").unwrap(), Some(b"snapshot".to_vec()));
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn test_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k1", b"x".to_vec(), Duration::from_millis(1))
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k1").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let cache = MemoryCache::new();
        cache
            .set("k1", b"x".to_vec(), Duration::from_secs(60))
            .unwrap();
        cache.delete("k1").unwrap();
        assert_eq!(cache.get("k1").unwrap(), None);
    }

    #[test]
    fn test_evict_expired() {
        let cache = MemoryCache::new();
        cache
            .set("short", b"x".to_vec(), Duration::from_millis(1))
            .unwrap();
        cache
            .set("long", b"y".to_vec(), Duration::from_secs(60))
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        cache.evict_expired();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("long").unwrap().is_some());
    }
}
