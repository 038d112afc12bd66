//! In-memory user store.
//!
//! Thread-safe storage with a fixed simulated latency per lookup, standing
//! in for a remote database round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use userhub_core::constants::DEFAULT_STORE_LATENCY_MS;
use userhub_core::error::{Result, UserhubError};
use userhub_core::traits::UserStore;
use userhub_core::types::{LookupField, UserRecord};

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Simulated latency of every fetch, in milliseconds
    pub latency_ms: u64,
}

impl StoreConfig {
    /// A store that answers immediately.
    pub fn instant() -> Self {
        Self { latency_ms: 0 }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_STORE_LATENCY_MS,
        }
    }
}

/// In-memory user store.
///
/// # Indexing
///
/// Users are indexed by:
/// - ID: primary storage
/// - Email: lowercased, for field lookups and duplicate rejection
/// - Username: lowercased, for field lookups and duplicate rejection
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryStore {
    /// Primary storage: ID → user
    users: DashMap<u64, UserRecord>,
    /// Email index: normalized email → user ID
    email_index: DashMap<String, u64>,
    /// Username index: normalized username → user ID
    username_index: DashMap<String, u64>,
    /// Fetches served, found or not
    calls: AtomicU64,
    latency: Duration,
}

impl MemoryStore {
    /// Creates an empty store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            users: DashMap::new(),
            email_index: DashMap::new(),
            username_index: DashMap::new(),
            calls: AtomicU64::new(0),
            latency: Duration::from_millis(config.latency_ms),
        }
    }

    /// Creates a store holding `users`.
    pub fn with_users(config: StoreConfig, users: Vec<UserRecord>) -> Result<Self> {
        let store = Self::with_config(config);
        store.import(users)?;
        Ok(store)
    }

    fn normalize(value: &str) -> String {
        value.trim().to_lowercase()
    }

    fn index_for(&self, field: LookupField) -> &DashMap<String, u64> {
        match field {
            LookupField::Email => &self.email_index,
            LookupField::Username => &self.username_index,
        }
    }

    /// Adds a user, rejecting a duplicate id, email or username.
    fn insert(&self, user: UserRecord) -> Result<()> {
        let email = Self::normalize(&user.email);
        let username = Self::normalize(&user.username);

        if email.is_empty() || username.is_empty() {
            return Err(UserhubError::InvalidKey(format!(
                "user {} needs a non-empty email and username",
                user.id
            )));
        }
        if self.users.contains_key(&user.id) {
            return Err(UserhubError::DuplicateUser(format!("id {}", user.id)));
        }
        if self.email_index.contains_key(&email) {
            return Err(UserhubError::DuplicateUser(format!("email {}", email)));
        }
        if self.username_index.contains_key(&username) {
            return Err(UserhubError::DuplicateUser(format!("username {}", username)));
        }

        debug!(id = user.id, "Inserting user");

        self.email_index.insert(email, user.id);
        self.username_index.insert(username, user.id);
        self.users.insert(user.id, user);
        Ok(())
    }

    /// Imports users, returning how many were added.
    pub(crate) fn import(&self, users: Vec<UserRecord>) -> Result<usize> {
        let mut imported = 0;
        for user in users {
            self.insert(user)?;
            imported += 1;
        }
        Ok(imported)
    }

    /// Number of fetches served since creation.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    async fn simulate_latency(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self))]
    async fn fetch_by_id(&self, id: u64) -> Result<Option<UserRecord>> {
        self.simulate_latency().await;
        let user = self.users.get(&id).map(|entry| entry.clone());
        debug!(id, found = user.is_some(), "Fetched by id");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn fetch_by_field(&self, field: LookupField, value: &str) -> Result<Option<UserRecord>> {
        self.simulate_latency().await;
        let id = self
            .index_for(field)
            .get(&Self::normalize(value))
            .map(|entry| *entry.value());
        let user = id.and_then(|id| self.users.get(&id).map(|entry| entry.clone()));
        debug!(%field, found = user.is_some(), "Fetched by field");
        Ok(user)
    }
}

/// A small fixed set of users for demos and local runs.
pub fn demo_users() -> Vec<UserRecord> {
    vec![
        UserRecord::new(1, "alice", "Alice Liddell", "alice@example.com"),
        UserRecord::new(2, "bob", "Bob Marley", "bob@example.com"),
        UserRecord::new(3, "carol", "Carol Danvers", "carol@example.com"),
        UserRecord::new(4, "dave", "Dave Bowman", "dave@example.com"),
        UserRecord::new(5, "erin", "Erin Brockovich", "erin@example.com"),
    ]
}
