//! Background sweeps of expired state.
//!
//! Lazy expiry only removes what somebody reads again. The reaper removes
//! cache entries past their TTL and rate-limit state for idle clients on a
//! fixed schedule, independent of traffic.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use userhub_cache::TtlCache;
use userhub_core::constants::{DEFAULT_CACHE_SWEEP_INTERVAL_MS, DEFAULT_LIMIT_SWEEP_INTERVAL_MS};

use crate::limiter::RateLimiter;

/// Sweep schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Milliseconds between cache sweeps
    pub cache_sweep_interval_ms: u64,
    /// Milliseconds between rate-limit sweeps
    pub limit_sweep_interval_ms: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            cache_sweep_interval_ms: DEFAULT_CACHE_SWEEP_INTERVAL_MS,
            limit_sweep_interval_ms: DEFAULT_LIMIT_SWEEP_INTERVAL_MS,
        }
    }
}

/// Sweeps a cache and a rate limiter.
pub struct Reaper<V> {
    cache: Arc<TtlCache<V>>,
    limiter: Arc<RateLimiter>,
}

impl<V> Reaper<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a reaper over shared state.
    pub fn new(cache: Arc<TtlCache<V>>, limiter: Arc<RateLimiter>) -> Self {
        Self { cache, limiter }
    }

    /// Removes cache entries older than the TTL. Returns how many.
    pub fn sweep_cache(&self) -> usize {
        let removed = self.cache.purge_expired();
        debug!(removed, remaining = self.cache.len(), "cache sweep");
        removed
    }

    /// Removes clients whose windows have all lapsed. Returns how many.
    pub fn sweep_limits(&self) -> usize {
        let removed = self.limiter.purge_idle(std::time::Instant::now());
        debug!(removed, remaining = self.limiter.tracked_clients(), "rate-limit sweep");
        removed
    }

    /// Runs both sweeps on their own intervals until the handle is shut down.
    ///
    /// The first sweep of each kind happens one full interval after spawning.
    pub fn spawn(self, config: &ReaperConfig) -> ReaperHandle {
        let cache_every = Duration::from_millis(config.cache_sweep_interval_ms.max(1));
        let limits_every = Duration::from_millis(config.limit_sweep_interval_ms.max(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut cache_tick = interval_at(start + cache_every, cache_every);
            let mut limits_tick = interval_at(start + limits_every, limits_every);
            cache_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            limits_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                cache_sweep_ms = cache_every.as_millis() as u64,
                limit_sweep_ms = limits_every.as_millis() as u64,
                "reaper started"
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = cache_tick.tick() => {
                        self.sweep_cache();
                    }
                    _ = limits_tick.tick() => {
                        self.sweep_limits();
                    }
                }
            }

            info!("reaper stopped");
        });

        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running reaper task.
///
/// Dropping the handle without calling [`ReaperHandle::shutdown`] also stops
/// the task, but nothing waits for it to exit.
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}
