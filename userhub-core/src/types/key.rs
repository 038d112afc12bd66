//! Cache keys and the queries they stand for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::USER_KEY_PREFIX;
use crate::error::{Result, UserhubError};

/// Secondary field a user can be looked up by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupField {
    /// `user:email:<address>`
    Email,
    /// `user:username:<handle>`
    Username,
}

impl LookupField {
    /// Key segment for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupField::Email => "email",
            LookupField::Username => "username",
        }
    }
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupField {
    type Err = UserhubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(LookupField::Email),
            "username" => Ok(LookupField::Username),
            other => Err(UserhubError::InvalidKey(format!("unknown lookup field '{}'", other))),
        }
    }
}

/// What a cache key asks the backing store for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserQuery {
    /// Primary-key lookup.
    ById(u64),
    /// Lookup by a unique secondary field.
    ByField {
        /// Field to match
        field: LookupField,
        /// Normalized value to match
        value: String,
    },
}

/// Opaque cache key, one entry per key.
///
/// Keys are `user:<id>` for primary lookups and `user:<field>:<value>` for
/// field lookups. Field values are trimmed and lowercased so that the same
/// user is never cached twice under differently-cased keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a primary-key lookup.
    pub fn user(id: u64) -> Self {
        Self(format!("{}:{}", USER_KEY_PREFIX, id))
    }

    /// Key for a field lookup.
    pub fn user_by(field: LookupField, value: &str) -> Self {
        Self(format!(
            "{}:{}:{}",
            USER_KEY_PREFIX,
            field,
            value.trim().to_lowercase()
        ))
    }

    /// Parses and normalizes a raw key.
    pub fn parse(raw: &str) -> Result<Self> {
        let query = parse_query(raw)?;
        Ok(match query {
            UserQuery::ById(id) => Self::user(id),
            UserQuery::ByField { field, value } => Self::user_by(field, &value),
        })
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the key to a backing store query.
    pub fn query(&self) -> Result<UserQuery> {
        parse_query(&self.0)
    }
}

fn parse_query(raw: &str) -> Result<UserQuery> {
    let raw = raw.trim();
    let mut parts = raw.splitn(3, ':');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(prefix), Some(id), None) if prefix == USER_KEY_PREFIX => id
            .parse::<u64>()
            .map(UserQuery::ById)
            .map_err(|_| UserhubError::InvalidKey(format!("'{}' is not a numeric user id", id))),
        (Some(prefix), Some(field), Some(value)) if prefix == USER_KEY_PREFIX => {
            let field = field.parse::<LookupField>()?;
            let value = value.trim().to_lowercase();
            if value.is_empty() {
                return Err(UserhubError::InvalidKey(format!("empty {} in key '{}'", field, raw)));
            }
            Ok(UserQuery::ByField { field, value })
        }
        _ => Err(UserhubError::InvalidKey(format!("'{}' is not a user key", raw))),
    }
}

impl FromStr for CacheKey {
    type Err = UserhubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("user:1", UserQuery::ById(1) ; "numeric id")]
    #[test_case(" user:42 ", UserQuery::ById(42) ; "surrounding whitespace")]
    #[test_case("user:email:Alice@Example.com", UserQuery::ByField { field: LookupField::Email, value: "alice@example.com".into() } ; "email lowercased")]
    #[test_case("user:username:bob", UserQuery::ByField { field: LookupField::Username, value: "bob".into() } ; "username")]
    fn test_parse_valid(raw: &str, expected: UserQuery) {
        assert_eq!(CacheKey::parse(raw).unwrap().query().unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("user:" ; "missing id")]
    #[test_case("user:abc" ; "non numeric id")]
    #[test_case("order:1" ; "wrong prefix")]
    #[test_case("user:phone:123" ; "unknown field")]
    #[test_case("user:email:  " ; "blank value")]
    fn test_parse_invalid(raw: &str) {
        assert!(matches!(CacheKey::parse(raw), Err(UserhubError::InvalidKey(_))));
    }

    #[test]
    fn test_key_normalization_is_stable() {
        let a = CacheKey::user_by(LookupField::Email, " Alice@Example.COM ");
        let b = CacheKey::parse("user:email:alice@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "user:email:alice@example.com");
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let key = CacheKey::user(7);
        assert_eq!(key.to_string().parse::<CacheKey>().unwrap(), key);
    }
}
