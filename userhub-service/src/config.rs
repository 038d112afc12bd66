//! Service configuration.

use serde::{Deserialize, Serialize};

use userhub_cache::CacheConfig;
use userhub_core::error::{Result, UserhubError};

use crate::limiter::RateLimitConfig;
use crate::reaper::ReaperConfig;

/// Everything a [`crate::UserService`] needs besides its store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Cache TTL and capacity
    pub cache: CacheConfig,
    /// Per-client limits
    pub rate_limit: RateLimitConfig,
    /// Background sweep schedule
    pub reaper: ReaperConfig,
}

impl ServiceConfig {
    /// Checks every section.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.rate_limit.validate()?;
        if self.reaper.cache_sweep_interval_ms == 0 || self.reaper.limit_sweep_interval_ms == 0 {
            return Err(UserhubError::Config("sweep intervals must be greater than zero".into()));
        }
        Ok(())
    }
}
