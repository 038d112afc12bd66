//! Single-flight deduplication of backing store calls.
//!
//! One mutex-guarded map from key to a shared pending fetch. The first caller
//! for a key spawns the fetch and registers it; later callers clone the
//! shared future instead of starting new work. The spawned task unregisters
//! the key before it yields its output, so nobody can join a finished fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, trace};

use userhub_core::error::{Result, UserhubError};

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;
type Registry<V> = Arc<Mutex<HashMap<String, SharedFetch<V>>>>;

/// How a [`SingleFlight::run`] call obtained its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The re-check found a value; no fetch was started or joined.
    Cache,
    /// This caller started the fetch.
    Leader,
    /// This caller attached to a fetch already in flight.
    Joined,
}

/// Removes a key from the registry when dropped, including on panic.
struct Registration<V> {
    registry: Registry<V>,
    key: String,
}

impl<V> Drop for Registration<V> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
        trace!(key = %self.key, "in-flight fetch unregistered");
    }
}

/// Collapses concurrent fetches for the same key into one.
///
/// Different keys never wait on each other. A fetch runs on its own task and
/// always completes, even when every caller has stopped waiting.
pub struct SingleFlight<V> {
    in_flight: Registry<V>,
}

impl<V> SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the shared outcome of the fetch for `key`.
    ///
    /// Under the registry lock: join the in-flight fetch if there is one;
    /// otherwise run `recheck` and return its value if it has one; otherwise
    /// start `work` and register it. `recheck` closes the window where a
    /// caller missed the cache just before a fetch completed and populated it.
    ///
    /// `work` must do everything that has to be visible before the key is
    /// unregistered, such as populating the cache. Every caller sharing a
    /// fetch gets a clone of the same `Ok` or `Err`.
    pub async fn run<C, F, Fut>(&self, key: &str, recheck: C, work: F) -> Result<(V, Origin)>
    where
        C: FnOnce() -> Option<V>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (fetch, origin) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key) {
                Some(existing) => {
                    trace!(key, "joining in-flight fetch");
                    (existing.clone(), Origin::Joined)
                }
                None => {
                    if let Some(value) = recheck() {
                        trace!(key, "value appeared before fetch started");
                        return Ok((value, Origin::Cache));
                    }
                    debug!(key, "starting fetch");
                    let fetch = self.spawn_fetch(key, work());
                    in_flight.insert(key.to_owned(), fetch.clone());
                    (fetch, Origin::Leader)
                }
            }
        };

        fetch.await.map(|value| (value, origin))
    }

    fn spawn_fetch<Fut>(&self, key: &str, work: Fut) -> SharedFetch<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let registration = Registration {
            registry: Arc::clone(&self.in_flight),
            key: key.to_owned(),
        };

        let task = tokio::spawn(async move {
            let outcome = work.await;
            drop(registration);
            outcome
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(UserhubError::Internal(format!("fetch task failed: {}", e))))
        }
        .boxed()
        .shared()
    }

    /// Number of fetches currently registered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl<V> Default for SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
