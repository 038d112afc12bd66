//! User records served by userhub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as held by the backing store.
///
/// Carries no credential material; password hashes and tokens live
/// elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique numeric identifier
    pub id: u64,
    /// Unique login handle
    pub username: String,
    /// Display name
    pub name: String,
    /// Contact address, unique per user
    pub email: String,
    /// When the user was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        id: u64,
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            name: name.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_defaults_created_at() {
        let json = r#"{"id":3,"username":"carol","name":"Carol","email":"carol@example.com"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.email, "carol@example.com");
        assert!(user.created_at <= Utc::now());
    }
}
