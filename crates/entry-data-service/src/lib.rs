//! Unified data service for the Entry Assistant data layer
//!
//! Sits between the screens and the encrypted record store: a TTL cache
//! per `(kind, owner)` pair with read-through/write-through semantics,
//! batched atomic loads and updates, one-time migration from the legacy
//! key-value store, and consistency/conflict diagnostics.
//!
//! The service is constructed once per process and handed to consumers
//! by reference; the cache is an owned field with an explicit lifecycle
//! (`clear_cache`, `refresh_cache`, `reset_cache_stats`), not a global.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
mod consistency;
mod migration;
pub mod service;

pub use cache::{CacheStats, RecordCache, DEFAULT_TTL};
pub use service::DataService;
