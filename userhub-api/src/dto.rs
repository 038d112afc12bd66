//! DTOs for API responses.

use serde::Serialize;
use userhub_core::types::UserRecord;

/// Response for health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
}

/// A user as returned over HTTP.
#[derive(Debug, Serialize)]
pub struct UserDto {
    /// Primary key
    pub id: u64,
    /// Unique handle
    pub username: String,
    /// Display name
    pub name: String,
    /// Unique email address
    pub email: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

impl From<&UserRecord> for UserDto {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for a user lookup.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    /// The user found
    pub user: UserDto,
    /// Whether the cache answered without a store call
    pub from_cache: bool,
    /// Time spent in the handler
    pub latency_ms: f64,
}

/// Response for clearing the cache.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Entries dropped
    pub cleared_entries: usize,
}
