//! The user lookup service.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use userhub_cache::TtlCache;
use userhub_core::error::Result;
use userhub_core::traits::UserStore;
use userhub_core::types::{CacheKey, UserRecord};

use crate::config::ServiceConfig;
use crate::flight::{Origin, SingleFlight};
use crate::limiter::{Admission, RateLimiter};
use crate::reaper::{Reaper, ReaperHandle};

/// Result of a lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup {
    /// The user, if the store knows it
    pub user: Option<Arc<UserRecord>>,
    /// True when the value was read from the cache rather than produced by
    /// a fetch this call started or joined.
    ///
    /// This includes a value that another caller's fetch cached after this
    /// call's first cache read missed: `from_cache` is then true even though
    /// the miss was already counted.
    pub from_cache: bool,
}

/// Combined cache, single-flight and limiter counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
    pub average_latency_ms: f64,
    /// Number of samples behind `average_latency_ms`
    pub latency_samples: usize,
    pub hit_rate: f64,
    /// Store fetches currently running
    pub in_flight: usize,
    /// Clients with rate-limit state
    pub tracked_clients: usize,
}

/// Cache-fronted, single-flight user lookups with per-client admission.
pub struct UserService {
    store: Arc<dyn UserStore>,
    cache: Arc<TtlCache<Arc<UserRecord>>>,
    flight: SingleFlight<Option<Arc<UserRecord>>>,
    limiter: Arc<RateLimiter>,
    config: ServiceConfig,
}

impl UserService {
    /// Creates a service over `store`.
    pub fn new(store: Arc<dyn UserStore>, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            cache: Arc::new(TtlCache::try_with_config(config.cache.clone())?),
            flight: SingleFlight::new(),
            limiter: Arc::new(RateLimiter::with_config(config.rate_limit.clone())),
            config,
        })
    }

    /// Looks a user up, going to the store at most once per key at a time.
    ///
    /// A fresh cache entry is returned directly. Otherwise the caller joins or
    /// starts the single fetch for the key; a found user is cached before the
    /// fetch is unregistered. A missing user is not cached.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn lookup(&self, key: &CacheKey) -> Result<Lookup> {
        if let Some(user) = self.cache.get(key.as_str()) {
            return Ok(Lookup {
                user: Some(user),
                from_cache: true,
            });
        }

        let query = key.query()?;
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let cache_key = key.as_str().to_owned();

        let (user, origin) = self
            .flight
            .run(
                key.as_str(),
                || self.cache.peek(key.as_str()).map(Some),
                move || async move {
                    let user = store.fetch(&query).await?.map(Arc::new);
                    if let Some(user) = &user {
                        cache.set(&cache_key, Arc::clone(user));
                    }
                    Ok(user)
                },
            )
            .await?;

        debug!(?origin, found = user.is_some(), "lookup resolved");
        Ok(Lookup {
            user,
            from_cache: origin == Origin::Cache,
        })
    }

    /// Parses `raw` as a cache key and looks it up.
    pub async fn lookup_str(&self, raw: &str) -> Result<Lookup> {
        let key: CacheKey = raw.parse()?;
        self.lookup(&key).await
    }

    /// Admits `client` and then looks `key` up.
    ///
    /// A rejected client gets [`userhub_core::UserhubError::RateLimited`]
    /// and the lookup never runs.
    pub async fn admit_and_lookup(&self, client: &str, key: &CacheKey) -> Result<Lookup> {
        self.limiter.check_admission(client).into_result()?;
        self.lookup(key).await
    }

    /// Checks and counts one request from `client`.
    pub fn check_admission(&self, client: &str) -> Admission {
        self.limiter.check_admission(client)
    }

    /// Adds one request latency sample, in milliseconds.
    pub fn record_latency(&self, ms: f64) {
        self.cache.record_latency(ms);
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> ServiceStats {
        let cache = self.cache.stats();
        ServiceStats {
            hit_rate: cache.hit_rate(),
            hits: cache.hits,
            misses: cache.misses,
            size: cache.size,
            capacity: cache.capacity,
            average_latency_ms: cache.average_latency_ms,
            latency_samples: cache.latency_samples,
            in_flight: self.flight.in_flight(),
            tracked_clients: self.limiter.tracked_clients(),
        }
    }

    /// Empties the cache and resets its counters.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Starts background sweeps of the cache and the limiter.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_reaper(&self) -> ReaperHandle {
        Reaper::new(Arc::clone(&self.cache), Arc::clone(&self.limiter)).spawn(&self.config.reaper)
    }
}
