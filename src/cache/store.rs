//! Core types and the storage trait for the snapshot cache.

use crate::amedas::types::SharedSnapshot;
use std::time::{Duration, Instant};

/// A cached resolution outcome for one publication timestamp.
///
/// Positive entries carry the snapshot and live for the positive TTL;
/// negative entries record "not yet published" and expire much sooner so
/// a late publication is picked up quickly. A store for a key replaces
/// whatever was there before, regardless of polarity.
#[derive(Debug, Clone)]
pub enum CacheEntry {
  /// Upstream had data for the timestamp.
  Positive {
    snapshot: SharedSnapshot,
    expires_at: Instant,
  },
  /// Upstream confirmed nothing is published for the timestamp yet.
  Negative { expires_at: Instant },
}

impl CacheEntry {
  pub fn positive(snapshot: SharedSnapshot, ttl: Duration) -> Self {
    Self::Positive {
      snapshot,
      expires_at: Instant::now() + ttl,
    }
  }

  pub fn negative(ttl: Duration) -> Self {
    Self::Negative {
      expires_at: Instant::now() + ttl,
    }
  }

  pub fn is_expired(&self, now: Instant) -> bool {
    let expires_at = match self {
      Self::Positive { expires_at, .. } => expires_at,
      Self::Negative { expires_at } => expires_at,
    };
    *expires_at <= now
  }
}

/// Result of a cache lookup.
///
/// Expiry is the store's concern: callers only ever see a live entry or
/// `Absent`, never an expired one.
#[derive(Debug, Clone)]
pub enum Lookup {
  /// A live positive entry; the snapshot is ready to serve.
  Positive(SharedSnapshot),
  /// A live negative entry; skip the fetch and fall back further.
  Negative,
  /// No live entry for this key.
  Absent,
}

/// Trait for snapshot cache backends.
///
/// Keys are the fully-qualified upstream URL for a publication timestamp.
/// Writes are fire-and-forget from the caller's point of view (a lost
/// write costs one redundant fetch, never correctness), so the methods
/// are infallible and must tolerate concurrent use (last-write-wins).
pub trait SnapshotStore: Send + Sync {
  /// Look up the entry for a key, dropping it if expired.
  fn lookup(&self, key: &str) -> Lookup;

  /// Record a successful fetch.
  fn store_positive(&self, key: &str, snapshot: SharedSnapshot, ttl: Duration);

  /// Record a confirmed "not yet published" outcome.
  fn store_negative(&self, key: &str, ttl: Duration);
}
