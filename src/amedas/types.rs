use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One upstream publication: observation records keyed by station id.
///
/// The record shape is upstream's business. Values are forwarded or
/// narrowed by key, never interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
  /// Look up the record for a station id.
  pub fn station(&self, id: &str) -> Option<&Value> {
    self.0.get(id)
  }
}

/// Snapshots are shared, not copied: the cache holds one reference for the
/// TTL window and every caller clones the `Arc`.
pub type SharedSnapshot = Arc<Snapshot>;
