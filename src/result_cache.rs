//! Expiring query result cache.
//!
//! Higher-level query operations pair a cache key with a query so repeated
//! executions can skip the database entirely. The cache is a concurrent map
//! from caller-chosen string keys to shared values with per-item expiration;
//! expired items are evicted lazily on access. The materialization core
//! never consults this cache.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default item expiration, in minutes.
pub const DEFAULT_EXPIRATION_MINUTES: u64 = 180;

#[derive(Debug, Clone)]
struct CacheItem<V> {
    value: Arc<V>,
    created_at: Instant,
    expires_after: Duration,
}

impl<V> CacheItem<V> {
    fn new(value: V, expires_after: Duration) -> Self {
        Self {
            value: Arc::new(value),
            created_at: Instant::now(),
            expires_after,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.expires_after
    }
}

/// Concurrent key/value cache with per-item expiration.
#[derive(Debug)]
pub struct ResultCache<V> {
    items: DashMap<String, CacheItem<V>>,
    default_expiration: Duration,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResultCache<V> {
    /// Create a cache with the default item expiration.
    pub fn new() -> Self {
        Self::with_expiration(Duration::from_secs(DEFAULT_EXPIRATION_MINUTES * 60))
    }

    /// Create a cache with a custom default item expiration.
    pub fn with_expiration(default_expiration: Duration) -> Self {
        Self {
            items: DashMap::new(),
            default_expiration,
        }
    }

    /// Insert a value under a key with the default expiration, replacing
    /// any existing item.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_expiration(key, value, self.default_expiration);
    }

    /// Insert a value under a key with an explicit expiration.
    pub fn put_with_expiration(&self, key: impl Into<String>, value: V, expires_after: Duration) {
        let key = key.into();
        debug!(key = %key, ?expires_after, "caching result");
        self.items.insert(key, CacheItem::new(value, expires_after));
    }

    /// Get the value for a key, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let expired = match self.items.get(key) {
            Some(item) if !item.is_expired() => return Some(Arc::clone(&item.value)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.items.remove(key);
        }
        None
    }

    /// Check whether a live item exists for a key.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove the item for a key. Returns true if a live item existed.
    pub fn remove(&self, key: &str) -> bool {
        match self.items.remove(key) {
            Some((_, item)) => !item.is_expired(),
            None => false,
        }
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.items.clear();
    }

    /// Get the number of live items, evicting expired ones along the way.
    pub fn len(&self) -> usize {
        self.items.retain(|_, item| !item.is_expired());
        self.items.len()
    }

    /// Check if the cache holds no live items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let cache: ResultCache<Vec<i64>> = ResultCache::new();
        cache.put("recent_ids", vec![1, 2, 3]);
        assert!(cache.contains("recent_ids"));
        assert_eq!(*cache.get("recent_ids").unwrap(), vec![1, 2, 3]);
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_put_replaces_existing() {
        let cache: ResultCache<i64> = ResultCache::new();
        cache.put("k", 1);
        cache.put("k", 2);
        assert_eq!(*cache.get("k").unwrap(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_item_is_evicted_on_access() {
        let cache: ResultCache<i64> = ResultCache::new();
        cache.put_with_expiration("k", 1, Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
        assert!(!cache.contains("k"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: ResultCache<i64> = ResultCache::new();
        cache.put("a", 1);
        cache.put("b", 2);
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_values_are_shared_not_cloned() {
        let cache: ResultCache<String> = ResultCache::new();
        cache.put("k", "value".to_string());
        let first = cache.get("k").unwrap();
        let second = cache.get("k").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_default_expiration_is_long() {
        let cache: ResultCache<i64> = ResultCache::new();
        cache.put("k", 1);
        assert!(cache.contains("k"));
        assert_eq!(DEFAULT_EXPIRATION_MINUTES, 180);
    }
}
