//! App state: the lookup service and the config it was built from.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use userhub_core::error::Result;
use userhub_core::traits::UserStore;
use userhub_service::{ServiceConfig, UserService};
use userhub_store::{demo_users, FileStore, MemoryStore, StoreConfig};

/// Server configuration.
#[derive(Clone, Debug, Default)]
pub struct ApiConfig {
    /// Cache, limiter and reaper settings
    pub service: ServiceConfig,
    /// Backing store settings
    pub store: StoreConfig,
    /// JSON seed file; the built-in demo users are served when unset
    pub data_file: Option<PathBuf>,
}

impl ApiConfig {
    /// Loads `.env` if present, then overrides defaults from `USERHUB_*`
    /// variables. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(ttl) = env_parse("USERHUB_CACHE_TTL_MS") {
            config.service.cache.ttl_ms = ttl;
        }
        if let Some(max) = env_parse("USERHUB_CACHE_MAX_ENTRIES") {
            config.service.cache.max_entries = max;
        }
        if let Some(max) = env_parse("USERHUB_BURST_MAX") {
            config.service.rate_limit.burst_max = max;
        }
        if let Some(max) = env_parse("USERHUB_SUSTAINED_MAX") {
            config.service.rate_limit.sustained_max = max;
        }
        if let Some(latency) = env_parse("USERHUB_STORE_LATENCY_MS") {
            config.store.latency_ms = latency;
        }
        config.data_file = std::env::var_os("USERHUB_DATA_FILE").map(PathBuf::from);
        config
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

/// Shared state behind every handler.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// The lookup service
    pub service: UserService,
}

impl AppState {
    /// Builds state around an existing store.
    pub fn new(config: ApiConfig, store: Arc<dyn UserStore>) -> Result<Self> {
        let service = UserService::new(store, config.service.clone())?;
        Ok(Self { config, service })
    }

    /// Builds state, opening the configured data file or seeding demo users.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let store: Arc<dyn UserStore> = match &config.data_file {
            Some(path) => {
                let store = FileStore::open(path, config.store.clone()).await?;
                info!(path = %path.display(), users = store.len(), "Serving users from file");
                Arc::new(store)
            }
            None => {
                let store = MemoryStore::with_users(config.store.clone(), demo_users())?;
                info!(users = store.len(), "Serving demo users");
                Arc::new(store)
            }
        };
        Self::new(config, store)
    }
}
