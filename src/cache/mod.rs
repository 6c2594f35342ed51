//! Dual-polarity snapshot cache.
//!
//! Caches both outcomes of an upstream probe per publication timestamp:
//! - positive entries hold a fetched snapshot for the positive TTL
//! - negative entries mark "not yet published" for a much shorter TTL
//!
//! The backend is an injected capability behind [`SnapshotStore`], so the
//! resolver can run against the in-memory store in production and tests
//! alike, or against [`NoopStore`] when caching is disabled.

mod memory;
mod store;

pub use memory::{MemoryStore, NoopStore};
pub use store::{CacheEntry, Lookup, SnapshotStore};
