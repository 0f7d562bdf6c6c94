//! Time source used for every timestamp the store writes.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// Source of the current time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Mutex::new(start),
    }
  }

  /// Move the clock forward (or backward, for negative durations).
  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut now) = self.now.lock() {
      *now += by;
    }
  }

  pub fn set(&self, to: DateTime<Utc>) {
    if let Ok(mut now) = self.now.lock() {
      *now = to;
    }
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    match self.now.lock() {
      Ok(now) => *now,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }
}

/// Format a timestamp the way it is stored: fixed-width RFC 3339, millisecond precision, `Z`.
///
/// Stored values compare lexically in chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `ts` cut to the precision it would have after a store round trip.
pub fn truncate_to_stored(ts: DateTime<Utc>) -> DateTime<Utc> {
  ts.trunc_subsecs(3)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| StoreError::Timestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_format_is_fixed_width_millis() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(format_timestamp(ts), "2024-01-01T00:00:00.000Z");
  }

  #[test]
  fn test_format_orders_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 59).unwrap();
    let b = a + chrono::Duration::milliseconds(1);
    assert!(format_timestamp(a) < format_timestamp(b));
  }

  #[test]
  fn test_parse_roundtrips_seed_format() {
    let parsed = parse_timestamp("2024-01-02T00:00:00Z").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    assert!(parse_timestamp("yesterday").is_err());
  }

  #[test]
  fn test_truncate_matches_format() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::microseconds(1_999);
    let truncated = truncate_to_stored(ts);
    assert_eq!(format_timestamp(truncated), format_timestamp(ts));
    assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), truncated);
  }

  #[test]
  fn test_manual_clock_advances() {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    clock.advance(chrono::Duration::seconds(30));
    assert_eq!(clock.now(), start + chrono::Duration::seconds(30));
  }
}
