//! # userhub Store
//!
//! Backing stores that answer user lookups the cache could not.
//!
//! - **Memory**: concurrent in-memory map with a fixed simulated latency per call
//! - **File**: the memory store seeded from, and saved back to, a JSON file
//!
//! ## Example
//!
//! ```rust,ignore
//! use userhub_store::{demo_users, MemoryStore, StoreConfig, UserStore};
//!
//! let store = MemoryStore::with_users(StoreConfig { latency_ms: 100 }, demo_users())?;
//!
//! // Takes ~100ms, like a real round trip
//! let alice = store.fetch_by_id(1).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{demo_users, MemoryStore, StoreConfig};

// Re-export the trait from core
pub use userhub_core::traits::UserStore;
