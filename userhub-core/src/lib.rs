//! # userhub Core
//!
//! Core types, errors, and traits shared by every userhub crate.
//!
//! - **Types**: [`UserRecord`], [`CacheKey`] and the [`UserQuery`] a key resolves to
//! - **Errors**: [`UserhubError`], cloneable so one outcome can fan out to many waiters
//! - **Constants**: default TTL, capacity, rate-limit windows and sweep intervals
//! - **Traits**: [`UserStore`], the backing store seam
//!
//! ## Example
//!
//! ```rust
//! use userhub_core::{CacheKey, UserQuery};
//!
//! let key = CacheKey::user(42);
//! assert_eq!(key.as_str(), "user:42");
//! assert_eq!(key.query().unwrap(), UserQuery::ById(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{RejectReason, Result, UserhubError};
pub use traits::*;
pub use types::*;
