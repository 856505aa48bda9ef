//! Read-through caching wrapper for whitelist stores.

use std::time::Duration;

use tracing::{debug, warn};

use super::cache::CacheBackend;
use super::error::WhitelistResult;
use super::model::Whitelist;
use super::store::WhitelistStore;

/// Build the deterministic cache key for a lookup.
#[must_use]
pub fn cache_key(field: &str, value: &str) -> String {
    format!("whitelist:{field}:{value}")
}

/// A whitelist store that keeps resolved snapshots warm in a cache.
///
/// Reads hit the cache first and fall back to the inner store, populating
/// the cache with a bounded TTL. Mutation notifications delete the entry
/// synchronously. Cache backend failures degrade to direct reads; they
/// never turn into authorization failures.
pub struct CachedStore<S, C> {
    inner: S,
    cache: C,
    ttl: Duration,
}

impl<S: WhitelistStore, C: CacheBackend> CachedStore<S, C> {
    /// Wrap a store with a cache layer.
    #[must_use]
    pub fn new(inner: S, cache: C, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The cache backend.
    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn read_cached(&self, key: &str) -> Option<Vec<Whitelist>> {
        let bytes = match self.cache.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling back to store");
                return None;
            },
        };

        match rmp_serde::from_slice(&bytes) {
            Ok(whitelists) => Some(whitelists),
            Err(e) => {
                // A snapshot we cannot decode is as good as absent.
                warn!(key, error = %e, "discarding undecodable cache snapshot");
                let _ = self.cache.delete(key);
                None
            },
        }
    }

    fn populate(&self, key: &str, whitelists: &[Whitelist]) {
        let bytes = match rmp_serde::to_vec(whitelists) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache snapshot");
                return;
            },
        };

        if let Err(e) = self.cache.set(key, bytes, self.ttl) {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

impl<S: WhitelistStore, C: CacheBackend> WhitelistStore for CachedStore<S, C> {
    fn find_by_field(&self, field: &str, value: &str) -> WhitelistResult<Vec<Whitelist>> {
        let key = cache_key(field, value);

        if let Some(whitelists) = self.read_cached(&key) {
            debug!(key = %key, count = whitelists.len(), "cache hit");
            return Ok(whitelists);
        }

        let whitelists = self.inner.find_by_field(field, value)?;
        self.populate(&key, &whitelists);
        Ok(whitelists)
    }

    fn invalidate(&self, field: &str, value: &str) {
        let key = cache_key(field, value);
        if let Err(e) = self.cache.delete(&key) {
            warn!(key = %key, error = %e, "cache invalidation failed");
        }
        self.inner.invalidate(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::whitelist::cache::MemoryCache;
    use crate::modules::whitelist::error::WhitelistError;
    use crate::modules::whitelist::matcher::parse_cidr;
    use crate::modules::whitelist::store::{MemoryStore, FIELD_PK};
    use std::sync::Arc;

    struct BrokenCache;

    impl CacheBackend for BrokenCache {
        fn get(&self, _key: &str) -> WhitelistResult<Option<Vec<u8>>> {
            Err(WhitelistError::CacheError("backend down".to_string()))
        }

        fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> WhitelistResult<()> {
            Err(WhitelistError::CacheError("backend down".to_string()))
        }

        fn delete(&self, _key: &str) -> WhitelistResult<()> {
            Err(WhitelistError::CacheError("backend down".to_string()))
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            Whitelist::new(1, "office", "office")
                .with_cidr("10.0.0.0/8")
                .unwrap(),
        );
        store
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("pk", "1"), "whitelist:pk:1");
        assert_eq!(cache_key("owner", "42"), "whitelist:owner:42");
    }

    #[test]
    fn test_read_through_populates_cache() {
        let store = seeded_store();
        let cached = CachedStore::new(Arc::clone(&store), MemoryCache::new(), Duration::from_secs(60));

        assert!(cached.cache().is_empty());
        let found = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(cached.cache().len(), 1);

        // Second read is served from the cache.
        let again = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(again, found);
    }

    #[test]
    fn test_stale_snapshot_until_invalidation() {
        let store = seeded_store();
        let cached = CachedStore::new(Arc::clone(&store), MemoryCache::new(), Duration::from_secs(60));

        let before = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(before[0].ranges.len(), 1);

        store.add_range(1, parse_cidr("192.168.0.0/16").unwrap()).unwrap();

        // Within the TTL the snapshot is still served.
        let stale = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(stale[0].ranges.len(), 1);

        // After invalidation the next read must see the mutation.
        cached.invalidate(FIELD_PK, "1");
        let fresh = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(fresh[0].ranges.len(), 2);
    }

    #[test]
    fn test_empty_results_are_cached() {
        let store = seeded_store();
        let cached = CachedStore::new(Arc::clone(&store), MemoryCache::new(), Duration::from_secs(60));

        assert!(cached.find_by_field(FIELD_PK, "99").unwrap().is_empty());
        assert_eq!(cached.cache().len(), 1);
    }

    #[test]
    fn test_broken_cache_degrades_to_direct_reads() {
        let store = seeded_store();
        let cached = CachedStore::new(Arc::clone(&store), BrokenCache, Duration::from_secs(60));

        // Every operation still succeeds against the inner store.
        let found = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(found.len(), 1);
        cached.invalidate(FIELD_PK, "1");
        let again = cached.find_by_field(FIELD_PK, "1").unwrap();
        assert_eq!(again, found);
    }

    #[test]
    fn test_store_errors_pass_through() {
        let store = seeded_store();
        let cached = CachedStore::new(Arc::clone(&store), MemoryCache::new(), Duration::from_secs(60));

        let err = cached.find_by_field("email", "x").unwrap_err();
        assert!(matches!(err, WhitelistError::UnknownLookupField { .. }));
    }
}
