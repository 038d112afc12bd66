//! Default tuning constants for userhub.
//!
//! Every value here is only a default: the cache, limiter and reaper all
//! take a config struct that starts from these numbers.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifetime of a cached entry, measured from insertion.
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;

/// Maximum number of entries held by the cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Upper bound on configured cache capacity. The LRU list allocates its
/// table up front, so an absurd capacity fails at construction.
pub const MAX_CACHE_ENTRIES: usize = 1_000_000;

/// Capacity of the recent-latency ring buffer.
pub const LATENCY_SAMPLE_CAPACITY: usize = 1000;

/// Prefix shared by every user cache key.
pub const USER_KEY_PREFIX: &str = "user";

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Requests admitted per sustained window.
pub const DEFAULT_SUSTAINED_MAX: u32 = 10;

/// Length of the sustained window.
pub const DEFAULT_SUSTAINED_WINDOW_MS: u64 = 60_000;

/// Requests admitted per burst window.
pub const DEFAULT_BURST_MAX: u32 = 5;

/// Length of the burst window.
pub const DEFAULT_BURST_WINDOW_MS: u64 = 10_000;

/// Client identity used when a request does not carry one.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

// ═══════════════════════════════════════════════════════════════════════════════
// REAPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Interval between cache expiry sweeps.
pub const DEFAULT_CACHE_SWEEP_INTERVAL_MS: u64 = 30_000;

/// Interval between idle rate-limit state sweeps.
pub const DEFAULT_LIMIT_SWEEP_INTERVAL_MS: u64 = 60_000;

// ═══════════════════════════════════════════════════════════════════════════════
// BACKING STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Simulated latency of a single backing store call.
pub const DEFAULT_STORE_LATENCY_MS: u64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_fits_inside_sustained() {
        assert!(DEFAULT_BURST_MAX < DEFAULT_SUSTAINED_MAX);
        assert!(DEFAULT_BURST_WINDOW_MS < DEFAULT_SUSTAINED_WINDOW_MS);
    }

    #[test]
    fn test_default_capacity_within_bound() {
        assert!(DEFAULT_CACHE_MAX_ENTRIES <= MAX_CACHE_ENTRIES);
    }

    #[test]
    fn test_sweep_faster_than_ttl() {
        assert!(DEFAULT_CACHE_SWEEP_INTERVAL_MS <= DEFAULT_CACHE_TTL_MS);
    }
}
