//! TTL cache for userhub records.
//!
//! Bounded in-memory cache combining least-recently-used capacity eviction
//! with an absolute per-entry lifetime. Hit/miss counters and a ring buffer
//! of recent request latencies live behind the same lock as the entries, so
//! [`TtlCache::clear`] resets both at once.

mod cache;
mod stats;

pub use cache::{CacheConfig, TtlCache};
pub use stats::{CacheStats, LatencyWindow};
