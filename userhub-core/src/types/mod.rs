//! Domain types for userhub.
//!
//! - [`UserRecord`]: a user as returned by the backing store
//! - [`CacheKey`]: the `user:<id>` / `user:<field>:<value>` key space
//! - [`UserQuery`]: what a key asks the backing store for

mod key;
mod user;

pub use key::*;
pub use user::*;
