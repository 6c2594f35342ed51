//! Structural projection of a resolved snapshot.

use serde_json::Value;

use crate::error::ServiceError;

use super::types::Snapshot;

/// Narrow a snapshot to one station record, or one metric within it.
///
/// Pure lookup: values come back cloned but untouched. A missing station
/// or metric is a caller error, distinct from resolution failure.
pub fn project(
  snapshot: &Snapshot,
  station: &str,
  metric: Option<&str>,
) -> Result<Value, ServiceError> {
  let record = snapshot
    .station(station)
    .ok_or(ServiceError::StationNotFound)?;

  match metric {
    None => Ok(record.clone()),
    Some(name) => record
      .get(name)
      .cloned()
      .ok_or_else(|| ServiceError::MetricNotFound {
        station: station.to_string(),
        metric: name.to_string(),
      }),
  }
}
