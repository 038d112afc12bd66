//! Per-client dual fixed-window rate limiter.
//!
//! Every client has a burst window and a sustained window. Each window opens
//! on the first admitted request after it lapsed and resets lazily, when a
//! later request observes that its reset time has passed.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use userhub_core::constants::{
    DEFAULT_BURST_MAX, DEFAULT_BURST_WINDOW_MS, DEFAULT_SUSTAINED_MAX, DEFAULT_SUSTAINED_WINDOW_MS,
};
use userhub_core::error::{RejectReason, Result, UserhubError};

/// Rate limiter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per sustained window
    pub sustained_max: u32,
    /// Sustained window length in milliseconds
    pub sustained_window_ms: u64,
    /// Requests admitted per burst window
    pub burst_max: u32,
    /// Burst window length in milliseconds
    pub burst_window_ms: u64,
}

impl RateLimitConfig {
    /// Rejects limits that would refuse every request.
    pub fn validate(&self) -> Result<()> {
        if self.sustained_max == 0 || self.burst_max == 0 {
            return Err(UserhubError::Config("rate limit maxima must be greater than zero".into()));
        }
        if self.sustained_window_ms == 0 || self.burst_window_ms == 0 {
            return Err(UserhubError::Config("rate limit windows must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sustained_max: DEFAULT_SUSTAINED_MAX,
            sustained_window_ms: DEFAULT_SUSTAINED_WINDOW_MS,
            burst_max: DEFAULT_BURST_MAX,
            burst_window_ms: DEFAULT_BURST_WINDOW_MS,
        }
    }
}

/// One fixed window: a counter and the instant it resets.
///
/// `reset_at` is `None` until the first admitted request opens the window.
#[derive(Clone, Copy, Debug, Default)]
struct Window {
    count: u32,
    reset_at: Option<Instant>,
}

impl Window {
    fn has_lapsed(&self, now: Instant) -> bool {
        self.reset_at.map_or(true, |reset_at| now >= reset_at)
    }

    fn roll(&mut self, now: Instant) {
        if self.reset_at.is_some() && self.has_lapsed(now) {
            *self = Window::default();
        }
    }

    fn admit(&mut self, now: Instant, period: Duration) {
        if self.reset_at.is_none() {
            self.reset_at = Some(now + period);
        }
        self.count += 1;
    }

    /// Whole seconds until reset, rounded up and never zero.
    fn retry_after_secs(&self, now: Instant) -> u64 {
        let remaining = self
            .reset_at
            .map(|reset_at| reset_at.saturating_duration_since(now))
            .unwrap_or_default();
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        secs.max(1)
    }
}

/// Both windows for one client.
#[derive(Clone, Copy, Debug, Default)]
struct ClientWindows {
    burst: Window,
    sustained: Window,
}

impl ClientWindows {
    fn is_idle(&self, now: Instant) -> bool {
        self.burst.has_lapsed(now) && self.sustained.has_lapsed(now)
    }
}

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Admission {
    /// Whether the request may proceed
    pub admitted: bool,
    /// Seconds until the rejecting window resets; 0 when admitted
    pub retry_after_secs: u64,
    /// Window that rejected the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    /// Requests left in the tighter of the two windows after this one
    pub remaining: u32,
}

impl Admission {
    fn admitted(remaining: u32) -> Self {
        Self {
            admitted: true,
            retry_after_secs: 0,
            reason: None,
            remaining,
        }
    }

    fn rejected(reason: RejectReason, retry_after_secs: u64) -> Self {
        Self {
            admitted: false,
            retry_after_secs,
            reason: Some(reason),
            remaining: 0,
        }
    }

    /// Converts a rejection into [`UserhubError::RateLimited`].
    pub fn into_result(self) -> Result<Self> {
        match self.reason {
            Some(reason) if !self.admitted => Err(UserhubError::RateLimited {
                reason,
                retry_after_secs: self.retry_after_secs,
            }),
            _ => Ok(self),
        }
    }
}

/// Per-client burst + sustained limiter.
///
/// The check and the increment for one client run under that client's
/// `DashMap` entry lock, so two concurrent requests can never both take the
/// last slot in a window.
#[derive(Debug)]
pub struct RateLimiter {
    clients: DashMap<String, ClientWindows>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a limiter with default limits.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Creates a limiter with custom limits.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            clients: DashMap::new(),
            config,
        }
    }

    /// Checks and, if admitted, counts a request from `client` now.
    pub fn check_admission(&self, client: &str) -> Admission {
        self.check_at(client, Instant::now())
    }

    /// Checks and, if admitted, counts a request from `client` at `now`.
    ///
    /// The burst window is checked before the sustained one; the first that
    /// is full decides the rejection. A rejected request counts against
    /// neither window.
    pub fn check_at(&self, client: &str, now: Instant) -> Admission {
        let burst_period = Duration::from_millis(self.config.burst_window_ms);
        let sustained_period = Duration::from_millis(self.config.sustained_window_ms);

        let mut entry = self.clients.entry(client.to_owned()).or_insert_with(ClientWindows::default);
        let windows = entry.value_mut();

        windows.burst.roll(now);
        windows.sustained.roll(now);

        if windows.burst.count >= self.config.burst_max {
            let retry = windows.burst.retry_after_secs(now);
            debug!(client, retry_after_secs = retry, "burst limit reached");
            return Admission::rejected(RejectReason::Burst, retry);
        }
        if windows.sustained.count >= self.config.sustained_max {
            let retry = windows.sustained.retry_after_secs(now);
            debug!(client, retry_after_secs = retry, "sustained limit reached");
            return Admission::rejected(RejectReason::Sustained, retry);
        }

        windows.burst.admit(now, burst_period);
        windows.sustained.admit(now, sustained_period);

        let remaining = (self.config.burst_max - windows.burst.count)
            .min(self.config.sustained_max - windows.sustained.count);
        Admission::admitted(remaining)
    }

    /// Drops every client whose burst and sustained windows have both lapsed.
    ///
    /// Returns the number of clients removed.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.clients.retain(|_, windows| {
            let idle = windows.is_idle(now);
            if idle {
                removed += 1;
            }
            !idle
        });
        removed
    }

    /// Number of clients with window state.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        for i in 0..5 {
            let admission = limiter.check_at("alice", t0 + Duration::from_millis(i * 100));
            assert!(admission.admitted, "request {} should be admitted", i + 1);
        }

        let sixth = limiter.check_at("alice", t0 + secs(1));
        assert!(!sixth.admitted);
        assert_eq!(sixth.reason, Some(RejectReason::Burst));
        assert!(sixth.retry_after_secs > 0);
        assert_eq!(sixth.retry_after_secs, 9);
    }

    #[test]
    fn test_other_client_unaffected() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..6 {
            limiter.check_at("alice", t0);
        }
        assert!(!limiter.check_at("alice", t0).admitted);
        assert!(limiter.check_at("bob", t0).admitted);
    }

    #[test]
    fn test_sustained_limit() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();

        // Two bursts of five, spaced beyond the burst window.
        for i in 0..5 {
            assert!(limiter.check_at("alice", t0 + Duration::from_millis(i)).admitted);
        }
        let t1 = t0 + secs(11);
        for i in 0..5 {
            assert!(limiter.check_at("alice", t1 + Duration::from_millis(i)).admitted);
        }

        // Past the second burst window, so only the sustained window can refuse.
        let eleventh = limiter.check_at("alice", t1 + secs(11));
        assert!(!eleventh.admitted);
        assert_eq!(eleventh.reason, Some(RejectReason::Sustained));
        // Sustained window opened at t0 and resets at t0 + 60s.
        assert_eq!(eleventh.retry_after_secs, 38);
    }

    #[test]
    fn test_rejection_does_not_count() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", t0);
        }
        for _ in 0..20 {
            assert!(!limiter.check_at("alice", t0 + secs(1)).admitted);
        }
        // Burst window lapsed; sustained has 5 of 10 used, not 25.
        for _ in 0..5 {
            assert!(limiter.check_at("alice", t0 + secs(10)).admitted);
        }
    }

    #[test]
    fn test_windows_reset_lazily() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", t0);
        }
        assert!(!limiter.check_at("alice", t0 + secs(9)).admitted);
        assert!(limiter.check_at("alice", t0 + secs(10)).admitted);
    }

    #[test]
    fn test_remaining_tracks_tighter_window() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("alice", t0).remaining, 4);
    }

    #[test]
    fn test_into_result() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            burst_max: 1,
            ..RateLimitConfig::default()
        });
        let t0 = Instant::now();
        assert!(limiter.check_at("alice", t0).into_result().is_ok());
        let err = limiter.check_at("alice", t0).into_result().unwrap_err();
        assert!(matches!(
            err,
            UserhubError::RateLimited { reason: RejectReason::Burst, retry_after_secs: 10 }
        ));
    }

    #[test]
    fn test_purge_idle_keeps_open_windows() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        limiter.check_at("early", t0);
        limiter.check_at("late", t0 + secs(30));

        // Burst lapsed for both, sustained still open for both.
        assert_eq!(limiter.purge_idle(t0 + secs(45)), 0);
        // "early" sustained window lapsed at t0 + 60s.
        assert_eq!(limiter.purge_idle(t0 + secs(61)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.purge_idle(t0 + secs(91)), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimitConfig::default().validate().is_ok());
        let zero = RateLimitConfig {
            burst_max: 0,
            ..RateLimitConfig::default()
        };
        assert!(matches!(zero.validate(), Err(UserhubError::Config(_))));
    }

    #[test]
    fn test_concurrent_checks_never_overadmit() {
        let limiter = Arc::new(RateLimiter::new());
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|_| limiter.check_at("shared", now).admitted)
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 5);
    }
}
