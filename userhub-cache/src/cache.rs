//! In-memory LRU + TTL cache.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use userhub_core::constants::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_MS, MAX_CACHE_ENTRIES,
};
use userhub_core::error::{Result, UserhubError};

use crate::stats::{CacheStats, Counters};

/// Cache entry with its absolute insertion time.
///
/// Recency lives in the LRU list; reading an entry never extends its
/// lifetime.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds, measured from insertion
    #[serde(alias = "ttlMs")]
    pub ttl_ms: u64,
    /// Maximum number of entries
    #[serde(alias = "maxEntries")]
    pub max_entries: usize,
}

impl CacheConfig {
    /// Entry lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Rejects configurations that would make the cache useless.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_ms == 0 {
            return Err(UserhubError::Config("cache ttl_ms must be greater than zero".into()));
        }
        if self.max_entries == 0 {
            return Err(UserhubError::Config("cache max_entries must be greater than zero".into()));
        }
        if self.max_entries > MAX_CACHE_ENTRIES {
            return Err(UserhubError::Config(format!(
                "cache max_entries must be at most {}",
                MAX_CACHE_ENTRIES
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

struct Inner<V> {
    entries: LruCache<String, CacheEntry<V>>,
    counters: Counters,
}

/// Bounded cache with LRU capacity eviction and absolute TTL expiry.
///
/// Thread-safe. Entries and statistics share one mutex: a lookup both
/// reorders the LRU list and bumps a counter, so there is no read-only path
/// worth an `RwLock`.
///
/// Expiry is lazy on read and proactive through [`TtlCache::purge_expired`].
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    config: CacheConfig,
}

impl<V: Clone> TtlCache<V> {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    ///
    /// `max_entries` is clamped to `1..=MAX_CACHE_ENTRIES`; use
    /// [`TtlCache::try_with_config`] to reject out-of-range values instead.
    pub fn with_config(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.min(MAX_CACHE_ENTRIES))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                counters: Counters::default(),
            }),
            config,
        }
    }

    /// Creates a cache after validating the configuration.
    pub fn try_with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Returns a fresh value and records a hit, or records a miss.
    ///
    /// A hit moves the entry to the most-recently-used position without
    /// touching its expiry. An expired entry is removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let ttl = self.config.ttl();
        let mut inner = self.inner.lock();

        let mut expired = false;
        let found = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now, ttl) => Some(entry.value.clone()),
            Some(_) => {
                expired = true;
                None
            }
            None => None,
        };

        if expired {
            inner.entries.pop(key);
            trace!(key, "dropped expired entry on read");
        }

        match found {
            Some(value) => {
                inner.counters.hits += 1;
                Some(value)
            }
            None => {
                inner.counters.misses += 1;
                None
            }
        }
    }

    /// Returns a fresh value without touching statistics or recency.
    pub fn peek(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let ttl = self.config.ttl();
        self.inner
            .lock()
            .entries
            .peek(key)
            .filter(|e| !e.is_expired(now, ttl))
            .map(|e| e.value.clone())
    }

    /// Returns true if a fresh entry exists, without touching statistics or recency.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let ttl = self.config.ttl();
        self.inner
            .lock()
            .entries
            .peek(key)
            .is_some_and(|e| !e.is_expired(now, ttl))
    }

    /// Inserts or replaces an entry with a fresh insertion time.
    ///
    /// When the cache is full and `key` is new, exactly one entry, the least
    /// recently accessed, is evicted first.
    pub fn set(&self, key: &str, value: V) {
        let entry = CacheEntry::new(value, Instant::now());
        let mut inner = self.inner.lock();

        if let Some((evicted, _)) = inner.entries.push(key.to_owned(), entry) {
            if evicted != key {
                debug!(evicted = %evicted, inserted = key, "evicted least recently used entry");
            }
        }
    }

    /// Removes an entry, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner.lock().entries.pop(key).map(|e| e.value)
    }

    /// Removes all entries and resets statistics in one critical section.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.counters.reset();
    }

    /// Removes every entry older than the TTL, regardless of recency.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.config.ttl();
        let mut inner = self.inner.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now, ttl))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key.as_str());
        }
        expired.len()
    }

    /// Records one request latency sample.
    pub fn record_latency(&self, ms: f64) {
        self.inner.lock().counters.latencies.record(ms);
    }

    /// Returns the number of entries physically held.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            size: inner.entries.len(),
            capacity: inner.entries.cap().get(),
            average_latency_ms: inner.counters.latencies.average(),
            latency_samples: inner.counters.latencies.len(),
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn short_lived(ttl_ms: u64, max_entries: usize) -> TtlCache<String> {
        TtlCache::with_config(CacheConfig { ttl_ms, max_entries })
    }

    #[test]
    fn test_cache_set_get() {
        let cache = TtlCache::new();
        cache.set("user:1", "alice".to_string());
        assert_eq!(cache.get("user:1").as_deref(), Some("alice"));
    }

    #[test]
    fn test_cache_miss() {
        let cache: TtlCache<String> = TtlCache::new();
        assert!(cache.get("user:404").is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_hits_and_misses_counted() {
        let cache = TtlCache::new();
        cache.get("user:1");
        cache.set("user:1", "alice".to_string());
        cache.get("user:1");
        cache.get("user:1");
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_has_and_peek_leave_stats_alone() {
        let cache = TtlCache::new();
        cache.set("user:1", "alice".to_string());
        assert!(cache.has("user:1"));
        assert!(!cache.has("user:2"));
        assert_eq!(cache.peek("user:1").as_deref(), Some("alice"));
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn test_cache_remove() {
        let cache = TtlCache::new();
        cache.set("user:1", "alice".to_string());
        assert_eq!(cache.remove("user:1").as_deref(), Some("alice"));
        assert!(cache.peek("user:1").is_none());
    }

    #[test]
    fn test_cache_clear_resets_stats() {
        let cache = TtlCache::new();
        cache.set("user:1", "alice".to_string());
        cache.set("user:2", "bob".to_string());
        cache.get("user:1");
        cache.get("user:3");
        cache.record_latency(12.0);

        cache.clear();

        let stats = cache.stats();
        assert!(cache.is_empty());
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 0);
        assert_eq!(stats.latency_samples, 0);
    }

    #[test]
    fn test_cache_ttl_expiration() {
        let cache = short_lived(5, 10);
        cache.set("user:1", "alice".to_string());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!cache.has("user:1"));
        assert!(cache.get("user:1").is_none());
        // Lazily removed on read.
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_read_does_not_extend_expiry() {
        let cache = short_lived(60, 10);
        cache.set("user:1", "alice".to_string());
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(20));
            cache.get("user:1");
        }
        assert!(cache.get("user:1").is_none());
    }

    #[test]
    fn test_overwrite_refreshes_insertion_time() {
        let cache = short_lived(100, 10);
        cache.set("user:1", "alice".to_string());
        std::thread::sleep(Duration::from_millis(60));
        cache.set("user:1", "alice v2".to_string());
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("user:1").as_deref(), Some("alice v2"));
    }

    #[test]
    fn test_capacity_evicts_least_recently_accessed() {
        let cache = short_lived(60_000, 2);
        cache.set("user:1", "alice".to_string());
        cache.set("user:2", "bob".to_string());
        // Touch user:1 so user:2 becomes the eviction candidate.
        cache.get("user:1");
        cache.set("user:3", "carol".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.has("user:1"));
        assert!(!cache.has("user:2"));
        assert!(cache.has("user:3"));
    }

    #[test]
    fn test_replacing_existing_key_evicts_nothing() {
        let cache = short_lived(60_000, 2);
        cache.set("user:1", "alice".to_string());
        cache.set("user:2", "bob".to_string());
        cache.set("user:1", "alice v2".to_string());
        assert_eq!(cache.len(), 2);
        assert!(cache.has("user:2"));
    }

    #[test]
    fn test_purge_expired_ignores_recency() {
        let cache = short_lived(30, 10);
        cache.set("user:1", "alice".to_string());
        cache.set("user:2", "bob".to_string());
        std::thread::sleep(Duration::from_millis(40));
        cache.set("user:3", "carol".to_string());

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("user:3"));
    }

    #[test]
    fn test_latency_average() {
        let cache: TtlCache<String> = TtlCache::new();
        cache.record_latency(10.0);
        cache.record_latency(30.0);
        let stats = cache.stats();
        assert_eq!(stats.average_latency_ms, 20.0);
        assert_eq!(stats.latency_samples, 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());
        let zero_ttl = CacheConfig { ttl_ms: 0, max_entries: 1 };
        assert!(matches!(
            TtlCache::<String>::try_with_config(zero_ttl),
            Err(UserhubError::Config(_))
        ));
        let zero_cap = CacheConfig { ttl_ms: 1, max_entries: 0 };
        assert!(zero_cap.validate().is_err());
        assert_eq!(TtlCache::<String>::with_config(zero_cap).stats().capacity, 1);
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let huge = CacheConfig { ttl_ms: 1, max_entries: usize::MAX };
        assert!(matches!(
            TtlCache::<String>::try_with_config(huge.clone()),
            Err(UserhubError::Config(_))
        ));
        let at_bound = CacheConfig { ttl_ms: 1, max_entries: MAX_CACHE_ENTRIES };
        assert!(at_bound.validate().is_ok());
        assert_eq!(
            TtlCache::<String>::with_config(huge).stats().capacity,
            MAX_CACHE_ENTRIES
        );
    }

    #[test]
    fn test_config_accepts_camel_case_options() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"ttlMs": 1500, "maxEntries": 3}"#).unwrap();
        assert_eq!(config, CacheConfig { ttl_ms: 1500, max_entries: 3 });
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            max_entries in 1usize..16,
            keys in proptest::collection::vec(0u16..64, 0..200),
        ) {
            let cache = short_lived(60_000, max_entries);
            for k in keys {
                cache.set(&format!("user:{}", k), k.to_string());
                prop_assert!(cache.len() <= max_entries);
            }
        }
    }
}
