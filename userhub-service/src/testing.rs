//! Instrumented store double for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use userhub_core::error::{Result, UserhubError};
use userhub_core::traits::UserStore;
use userhub_core::types::{LookupField, UserRecord};
use userhub_store::{demo_users, MemoryStore, StoreConfig};

#[derive(Default)]
struct KeyGauge {
    current: usize,
    peak: usize,
}

/// Wraps a [`MemoryStore`], tracking total calls and the peak number of
/// concurrent calls per query.
pub(crate) struct CountingStore {
    inner: MemoryStore,
    latency: Duration,
    calls: AtomicUsize,
    gauges: Mutex<HashMap<String, KeyGauge>>,
    failing: AtomicBool,
}

impl CountingStore {
    pub fn new(latency_ms: u64) -> Self {
        let inner = MemoryStore::with_users(StoreConfig::instant(), demo_users())
            .expect("demo users are unique");
        Self {
            inner,
            latency: Duration::from_millis(latency_ms),
            calls: AtomicUsize::new(0),
            gauges: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping calls seen for any single query.
    pub fn peak_concurrency(&self) -> usize {
        self.gauges.lock().values().map(|g| g.peak).max().unwrap_or(0)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn observe<F>(&self, query: String, lookup: F) -> Result<Option<UserRecord>>
    where
        F: std::future::Future<Output = Result<Option<UserRecord>>>,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut gauges = self.gauges.lock();
            let gauge = gauges.entry(query.clone()).or_default();
            gauge.current += 1;
            gauge.peak = gauge.peak.max(gauge.current);
        }

        tokio::time::sleep(self.latency).await;
        let outcome = if self.failing.load(Ordering::SeqCst) {
            Err(UserhubError::BackingStore("store unavailable".into()))
        } else {
            lookup.await
        };

        if let Some(gauge) = self.gauges.lock().get_mut(&query) {
            gauge.current -= 1;
        }
        outcome
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn fetch_by_id(&self, id: u64) -> Result<Option<UserRecord>> {
        self.observe(format!("id:{}", id), self.inner.fetch_by_id(id)).await
    }

    async fn fetch_by_field(&self, field: LookupField, value: &str) -> Result<Option<UserRecord>> {
        self.observe(
            format!("{}:{}", field, value),
            self.inner.fetch_by_field(field, value),
        )
        .await
    }
}
