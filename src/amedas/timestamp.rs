//! Publication timestamp grid for the upstream dataset.
//!
//! Upstream publishes one snapshot per cadence boundary (every 10 minutes
//! in JST for Amedas map data), named by a fixed-width `YYYYMMDDHHMM00`
//! timestamp. This module maps an arbitrary instant onto that grid and
//! steps backward through it.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use color_eyre::{eyre::eyre, Result};
use std::fmt;

/// A publication timestamp in canonical `YYYYMMDDHHMM00` form.
///
/// Always cadence-aligned in the source time zone. Lexicographic order of
/// the string matches chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObsTimestamp(String);

impl ObsTimestamp {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ObsTimestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Maps a reference instant + fallback offset onto the publication grid.
#[derive(Debug, Clone, Copy)]
pub struct TimestampGenerator {
  cadence_minutes: u32,
  zone: FixedOffset,
}

impl TimestampGenerator {
  /// Create a generator for the given cadence and source time zone.
  ///
  /// The cadence must divide an hour evenly so the grid is stable across
  /// hour boundaries.
  pub fn new(cadence_minutes: u32, utc_offset_hours: i32) -> Result<Self> {
    if cadence_minutes == 0 || 60 % cadence_minutes != 0 {
      return Err(eyre!(
        "Cadence must divide an hour evenly, got {} minutes",
        cadence_minutes
      ));
    }

    let zone = FixedOffset::east_opt(utc_offset_hours * 3600)
      .ok_or_else(|| eyre!("Invalid UTC offset: {} hours", utc_offset_hours))?;

    Ok(Self {
      cadence_minutes,
      zone,
    })
  }

  /// Timestamp for the given fallback offset.
  ///
  /// Offset 0 is the most recent cadence boundary at or before the
  /// reference instant; offset k is k cadence-periods earlier. Larger
  /// offsets always yield strictly earlier timestamps.
  pub fn at(&self, reference: DateTime<Utc>, offset: u32) -> ObsTimestamp {
    let local = reference.with_timezone(&self.zone);

    let floored = local
      - Duration::minutes((local.minute() % self.cadence_minutes) as i64)
      - Duration::seconds(local.second() as i64)
      - Duration::nanoseconds(local.nanosecond() as i64);

    let target = floored - Duration::minutes(offset as i64 * self.cadence_minutes as i64);

    ObsTimestamp(format!("{}00", target.format("%Y%m%d%H%M")))
  }
}
