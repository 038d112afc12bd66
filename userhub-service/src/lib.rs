//! # userhub Service
//!
//! The concurrency-and-freshness core of userhub.
//!
//! ```text
//!   request ──► RateLimiter ──► TtlCache ──hit──► response
//!                                  │
//!                                 miss
//!                                  ▼
//!                            SingleFlight ──► UserStore
//!                                  │
//!                        populate cache, unregister
//!                                  ▼
//!                              response
//! ```
//!
//! - [`SingleFlight`]: at most one in-flight store call per key; late
//!   callers share the leader's result
//! - [`RateLimiter`]: per-client burst and sustained fixed windows
//! - [`Reaper`]: background sweeps of expired cache entries and idle clients
//! - [`UserService`]: the façade the HTTP layer talks to
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use userhub_service::{ServiceConfig, UserService};
//! use userhub_store::{demo_users, MemoryStore, StoreConfig};
//!
//! let store = MemoryStore::with_users(StoreConfig::default(), demo_users())?;
//! let service = UserService::new(Arc::new(store), ServiceConfig::default())?;
//! let reaper = service.spawn_reaper();
//!
//! let lookup = service.admit_and_lookup("client-a", &"user:1".parse()?).await?;
//! println!("from cache: {}", lookup.from_cache);
//!
//! reaper.shutdown().await;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod flight;
mod limiter;
mod reaper;
mod service;

#[cfg(test)]
mod testing;

pub use config::ServiceConfig;
pub use flight::{Origin, SingleFlight};
pub use limiter::{Admission, RateLimitConfig, RateLimiter};
pub use reaper::{Reaper, ReaperConfig, ReaperHandle};
pub use service::{Lookup, ServiceStats, UserService};
