//! Error types for userhub.
//!
//! A record that does not exist is not an error: stores and the service
//! return `Ok(None)` for it. Everything here is recoverable at the HTTP
//! boundary.
//!
//! `UserhubError` is `Clone` because a single backing store failure is handed
//! to every caller waiting on the same in-flight fetch. Foreign errors are
//! therefore captured by message rather than wrapped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `UserhubError`.
pub type Result<T> = std::result::Result<T, UserhubError>;

/// Which rate-limit window rejected a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    /// The short burst window is exhausted.
    Burst,
    /// The long sustained window is exhausted.
    Sustained,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Burst => f.write_str("burst"),
            RejectReason::Sustained => f.write_str("sustained"),
        }
    }
}

/// Main error type for all userhub operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UserhubError {
    // ═══════════════════════════════════════════════════════════════════════════
    // ADMISSION
    // ═══════════════════════════════════════════════════════════════════════════

    /// The client exceeded one of its rate-limit windows.
    #[error("Rate limited ({reason} window): retry after {retry_after_secs}s")]
    RateLimited {
        /// Window that rejected the request.
        reason: RejectReason,
        /// Whole seconds until that window resets.
        retry_after_secs: u64,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // BACKING STORE
    // ═══════════════════════════════════════════════════════════════════════════

    /// The backing store failed to answer a lookup.
    #[error("Backing store failure: {0}")]
    BackingStore(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT
    // ═══════════════════════════════════════════════════════════════════════════

    /// A cache key could not be interpreted as a user query.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A user with the same id, email or username already exists.
    #[error("Duplicate user: {0}")]
    DuplicateUser(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UserhubError {
    /// Seconds the caller should wait, if this is a rate-limit rejection.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            UserhubError::RateLimited { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<std::io::Error> for UserhubError {
    fn from(err: std::io::Error) -> Self {
        UserhubError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for UserhubError {
    fn from(err: serde_json::Error) -> Self {
        UserhubError::Json(err.to_string())
    }
}
