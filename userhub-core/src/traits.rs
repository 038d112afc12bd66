//! Common traits for userhub.
//!
//! These traits define the seams between the caching core and the systems
//! it fronts, so the service can be tested against in-memory doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{LookupField, UserQuery, UserRecord};

// ═══════════════════════════════════════════════════════════════════════════════
// BACKING STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the authoritative user store behind the cache.
///
/// Implementations might use:
/// - In-memory storage with simulated latency (for development/testing)
/// - A JSON seed file loaded at startup
/// - A database
///
/// A missing user is `Ok(None)`, never an error. Implementations must be
/// safe to call concurrently.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetches a user by primary key.
    async fn fetch_by_id(&self, id: u64) -> Result<Option<UserRecord>>;

    /// Fetches a user by a unique secondary field.
    async fn fetch_by_field(&self, field: LookupField, value: &str) -> Result<Option<UserRecord>>;

    /// Dispatches a parsed query to the matching fetch method.
    async fn fetch(&self, query: &UserQuery) -> Result<Option<UserRecord>> {
        match query {
            UserQuery::ById(id) => self.fetch_by_id(*id).await,
            UserQuery::ByField { field, value } => self.fetch_by_field(*field, value).await,
        }
    }
}
