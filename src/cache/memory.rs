//! In-memory store implementations.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::amedas::types::SharedSnapshot;

use super::store::{CacheEntry, Lookup, SnapshotStore};

/// Concurrent in-memory TTL store.
///
/// Entries live seconds, not sessions, so there is no persistence and no
/// eviction beyond lazy expiry at lookup time. Lookups and stores may race
/// across requests; per-key last-write-wins is all the resolver needs.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: DashMap<String, CacheEntry>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of live and expired-but-unswept entries.
  #[allow(dead_code)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[allow(dead_code)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl SnapshotStore for MemoryStore {
  fn lookup(&self, key: &str) -> Lookup {
    let now = Instant::now();

    if let Some(entry) = self.entries.get(key) {
      if !entry.is_expired(now) {
        return match entry.value() {
          CacheEntry::Positive { snapshot, .. } => Lookup::Positive(snapshot.clone()),
          CacheEntry::Negative { .. } => Lookup::Negative,
        };
      }
    } else {
      return Lookup::Absent;
    }

    // Expired. The read guard is released, so the shard can be written;
    // re-check under the write lock so a concurrent fresh store survives.
    self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    Lookup::Absent
  }

  fn store_positive(&self, key: &str, snapshot: SharedSnapshot, ttl: Duration) {
    self
      .entries
      .insert(key.to_string(), CacheEntry::positive(snapshot, ttl));
  }

  fn store_negative(&self, key: &str, ttl: Duration) {
    self
      .entries
      .insert(key.to_string(), CacheEntry::negative(ttl));
  }
}

/// Store implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl SnapshotStore for NoopStore {
  fn lookup(&self, _key: &str) -> Lookup {
    Lookup::Absent // Always miss
  }

  fn store_positive(&self, _key: &str, _snapshot: SharedSnapshot, _ttl: Duration) {
    // Discard
  }

  fn store_negative(&self, _key: &str, _ttl: Duration) {
    // Discard
  }
}
