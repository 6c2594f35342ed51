//! Fallback resolution: walk the publication grid until data is found.
//!
//! Attempts are strictly ordered by recency and stop at the first success,
//! so a request costs at most one cache lookup plus one fetch per offset.
//! Cache writes happen off the response path; losing one only means a
//! redundant fetch later.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{Lookup, SnapshotStore};
use crate::error::ServiceError;

use super::client::{Fetch, FetchOutcome};
use super::timestamp::{ObsTimestamp, TimestampGenerator};
use super::types::SharedSnapshot;

/// Resolution policy knobs, all sourced from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
  /// Upper bound on fallback attempts. Never derived from request input.
  pub max_fallback: u32,
  /// Skip the cache lookup at offset 0 so the freshest boundary is always
  /// probed live. Outcomes are still written back.
  pub refresh_latest: bool,
  pub positive_ttl: Duration,
  pub negative_ttl: Duration,
}

/// A successfully resolved snapshot and where on the grid it was found.
#[derive(Debug, Clone)]
pub struct Resolved {
  pub snapshot: SharedSnapshot,
  pub timestamp: ObsTimestamp,
  pub offset: u32,
}

/// Resolves the most recent available snapshot through cache and fetcher.
pub struct SnapshotResolver<F> {
  fetcher: F,
  store: Arc<dyn SnapshotStore>,
  timestamps: TimestampGenerator,
  config: ResolverConfig,
}

impl<F: Fetch> SnapshotResolver<F> {
  pub fn new(
    fetcher: F,
    store: Arc<dyn SnapshotStore>,
    timestamps: TimestampGenerator,
    config: ResolverConfig,
  ) -> Self {
    Self {
      fetcher,
      store,
      timestamps,
      config,
    }
  }

  /// Resolve the freshest snapshot available at `reference`.
  ///
  /// For each offset, in order: a cached positive ends the search, a cached
  /// negative skips the fetch, and on a miss the fetcher is invoked exactly
  /// once. Confirmed absence is cached negatively; transient failures are
  /// not cached at all. Exhausting every offset yields
  /// [`ServiceError::NoData`].
  pub async fn resolve_latest(&self, reference: DateTime<Utc>) -> Result<Resolved, ServiceError> {
    for offset in 0..self.config.max_fallback {
      let ts = self.timestamps.at(reference, offset);
      let key = self.fetcher.cache_key(&ts);

      let consult_cache = !(self.config.refresh_latest && offset == 0);
      if consult_cache {
        match self.store.lookup(&key) {
          Lookup::Positive(snapshot) => {
            debug!("{}: cache hit at offset {}", ts, offset);
            return Ok(Resolved {
              snapshot,
              timestamp: ts,
              offset,
            });
          }
          Lookup::Negative => {
            debug!("{}: cached as not yet published, falling back", ts);
            continue;
          }
          Lookup::Absent => {}
        }
      }

      match self.fetcher.fetch(&ts).await {
        FetchOutcome::Published(snapshot) => {
          self.write_positive(key, snapshot.clone());
          return Ok(Resolved {
            snapshot,
            timestamp: ts,
            offset,
          });
        }
        FetchOutcome::NotPublished => {
          debug!("{}: not published yet, falling back", ts);
          self.write_negative(key);
        }
        FetchOutcome::Transient(reason) => {
          warn!("{}: fetch failed, falling back: {}", ts, reason);
        }
      }
    }

    Err(ServiceError::NoData)
  }

  // Write-backs run on their own tasks so the response never waits on the
  // store. The spawned task owns its store handle and cannot fail the
  // request.
  fn write_positive(&self, key: String, snapshot: SharedSnapshot) {
    let store = Arc::clone(&self.store);
    let ttl = self.config.positive_ttl;
    tokio::spawn(async move {
      store.store_positive(&key, snapshot, ttl);
    });
  }

  fn write_negative(&self, key: String) {
    let store = Arc::clone(&self.store);
    let ttl = self.config.negative_ttl;
    tokio::spawn(async move {
      store.store_negative(&key, ttl);
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::amedas::types::Snapshot;
  use crate::cache::MemoryStore;
  use async_trait::async_trait;
  use chrono::TimeZone;
  use serde_json::json;
  use std::collections::VecDeque;
  use std::sync::Mutex;

  /// Fetcher that replays a fixed script of outcomes and records every
  /// timestamp it was asked for.
  #[derive(Clone, Default)]
  struct ScriptedFetch {
    script: Arc<Mutex<VecDeque<FetchOutcome>>>,
    calls: Arc<Mutex<Vec<String>>>,
  }

  impl ScriptedFetch {
    fn with_script(outcomes: Vec<FetchOutcome>) -> Self {
      Self {
        script: Arc::new(Mutex::new(outcomes.into())),
        calls: Arc::new(Mutex::new(Vec::new())),
      }
    }

    fn calls(&self) -> Vec<String> {
      self.calls.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Fetch for ScriptedFetch {
    fn cache_key(&self, ts: &ObsTimestamp) -> String {
      format!("test/{}.json", ts)
    }

    async fn fetch(&self, ts: &ObsTimestamp) -> FetchOutcome {
      self.calls.lock().unwrap().push(ts.to_string());
      self
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| FetchOutcome::Transient("script exhausted".to_string()))
    }
  }

  fn snapshot(temp: f64) -> SharedSnapshot {
    Arc::new(
      serde_json::from_value::<Snapshot>(json!({
        "46106": { "temp": [temp, 0] }
      }))
      .unwrap(),
    )
  }

  fn config() -> ResolverConfig {
    ResolverConfig {
      max_fallback: 5,
      refresh_latest: false,
      positive_ttl: Duration::from_secs(60),
      negative_ttl: Duration::from_secs(10),
    }
  }

  fn generator() -> TimestampGenerator {
    TimestampGenerator::new(10, 9).unwrap()
  }

  fn reference() -> DateTime<Utc> {
    // 13:47 JST
    Utc.with_ymd_and_hms(2025, 11, 30, 4, 47, 0).unwrap()
  }

  /// Let spawned write-back tasks land.
  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  #[tokio::test]
  async fn test_success_at_offset_zero_fetches_once_and_caches() {
    let fetch = ScriptedFetch::with_script(vec![FetchOutcome::Published(snapshot(12.3))]);
    let store = Arc::new(MemoryStore::new());
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    assert_eq!(resolved.offset, 0);
    assert_eq!(resolved.timestamp.as_str(), "20251130134000");
    assert_eq!(fetch.calls(), vec!["20251130134000"]);

    settle().await;
    assert_eq!(store.len(), 1);
    match store.lookup("test/20251130134000.json") {
      Lookup::Positive(cached) => assert!(Arc::ptr_eq(&cached, &resolved.snapshot)),
      other => panic!("expected positive entry, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_cached_positive_short_circuits_without_fetch() {
    let fetch = ScriptedFetch::default();
    let store = Arc::new(MemoryStore::new());
    let snap = snapshot(1.0);
    store.store_positive("test/20251130134000.json", snap.clone(), Duration::from_secs(60));

    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    assert!(Arc::ptr_eq(&resolved.snapshot, &snap));
    assert!(fetch.calls().is_empty(), "cache hit must not fetch");
  }

  #[tokio::test]
  async fn test_cached_negative_skips_fetch_for_that_offset() {
    let fetch = ScriptedFetch::with_script(vec![FetchOutcome::Published(snapshot(2.0))]);
    let store = Arc::new(MemoryStore::new());
    store.store_negative("test/20251130134000.json", Duration::from_secs(10));

    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    // Offset 0 was skipped entirely; the single fetch went to offset 1.
    assert_eq!(resolved.offset, 1);
    assert_eq!(fetch.calls(), vec!["20251130133000"]);
  }

  #[tokio::test]
  async fn test_falls_back_past_unpublished_timestamps() {
    let fetch = ScriptedFetch::with_script(vec![
      FetchOutcome::NotPublished,
      FetchOutcome::NotPublished,
      FetchOutcome::Published(snapshot(3.0)),
    ]);
    let store = Arc::new(MemoryStore::new());
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    assert_eq!(resolved.offset, 2);
    assert_eq!(
      fetch.calls(),
      vec!["20251130134000", "20251130133000", "20251130132000"]
    );

    settle().await;
    assert_eq!(store.len(), 3, "two negatives and one positive");
    assert!(matches!(
      store.lookup("test/20251130134000.json"),
      Lookup::Negative
    ));
    assert!(matches!(
      store.lookup("test/20251130133000.json"),
      Lookup::Negative
    ));
    assert!(matches!(
      store.lookup("test/20251130132000.json"),
      Lookup::Positive(_)
    ));
  }

  #[tokio::test]
  async fn test_exhaustion_returns_no_data_and_caches_negatives() {
    let fetch = ScriptedFetch::with_script(vec![
      FetchOutcome::NotPublished,
      FetchOutcome::NotPublished,
      FetchOutcome::NotPublished,
      FetchOutcome::NotPublished,
      FetchOutcome::NotPublished,
    ]);
    let store = Arc::new(MemoryStore::new());
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let err = resolver.resolve_latest(reference()).await.unwrap_err();

    assert_eq!(err, ServiceError::NoData);
    assert_eq!(fetch.calls().len(), 5);

    settle().await;
    assert_eq!(store.len(), 5, "every confirmed absence is cached");
  }

  #[tokio::test]
  async fn test_transient_failures_are_not_cached() {
    let fetch = ScriptedFetch::with_script(vec![
      FetchOutcome::Transient("timeout".to_string()),
      FetchOutcome::Published(snapshot(4.0)),
    ]);
    let store = Arc::new(MemoryStore::new());
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    assert_eq!(resolved.offset, 1);

    settle().await;
    // Only the positive landed; the transient outcome left no entry.
    assert_eq!(store.len(), 1);
    assert!(matches!(
      store.lookup("test/20251130134000.json"),
      Lookup::Absent
    ));
  }

  #[tokio::test]
  async fn test_all_transient_exhausts_without_caching() {
    let fetch = ScriptedFetch::default();
    let store = Arc::new(MemoryStore::new());
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      config(),
    );

    let err = resolver.resolve_latest(reference()).await.unwrap_err();

    assert_eq!(err, ServiceError::NoData);
    assert_eq!(fetch.calls().len(), 5);

    settle().await;
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_refresh_latest_probes_offset_zero_despite_cache() {
    let fetch = ScriptedFetch::with_script(vec![FetchOutcome::Published(snapshot(9.9))]);
    let store = Arc::new(MemoryStore::new());
    store.store_positive(
      "test/20251130134000.json",
      snapshot(1.1),
      Duration::from_secs(60),
    );

    let mut cfg = config();
    cfg.refresh_latest = true;
    let resolver = SnapshotResolver::new(
      fetch.clone(),
      store.clone() as Arc<dyn SnapshotStore>,
      generator(),
      cfg,
    );

    let resolved = resolver.resolve_latest(reference()).await.unwrap();

    assert_eq!(fetch.calls(), vec!["20251130134000"]);
    assert_eq!(resolved.offset, 0);

    settle().await;
    // The live result replaced the stale entry.
    match store.lookup("test/20251130134000.json") {
      Lookup::Positive(cached) => assert!(Arc::ptr_eq(&cached, &resolved.snapshot)),
      other => panic!("expected refreshed positive entry, got {:?}", other),
    }
  }
}
