//! Tunable ceilings for the code store and the global circuit breaker.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Rate, size and retention limits, read from the `[limits]` config table.
///
/// Every field has a default, so a partial table is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Stored blobs kept before the oldest is evicted.
  pub max_saves_total:                u64,
  /// Saves per address (or device) in the trailing hour.
  pub max_saves_per_hour:             u64,
  /// Loads per address in the trailing hour, counting the current one.
  pub max_loads_per_hour:             u64,
  /// Lookups of well-formed but unknown codes per address per hour.
  pub max_failed_loads_per_hour:      u64,
  pub global_max_requests_per_hour:   u64,
  pub global_max_requests_per_minute: u64,
  pub expiration_days:                u32,
  pub max_save_size_kb:               u64,
  pub log_retention_hours:            u32,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_saves_total:                15_000,
      max_saves_per_hour:             5,
      max_loads_per_hour:             10,
      max_failed_loads_per_hour:      6,
      global_max_requests_per_hour:   3_000,
      global_max_requests_per_minute: 1_000,
      expiration_days:                120,
      max_save_size_kb:               200,
      log_retention_hours:            24,
    }
  }
}

impl Limits {
  /// Largest accepted save payload, in bytes.
  pub fn max_save_bytes(&self) -> u64 { self.max_save_size_kb.saturating_mul(1024) }

  /// Age after which a stored blob is no longer served and may be swept.
  pub fn expiry(&self) -> TimeDelta { TimeDelta::days(i64::from(self.expiration_days)) }

  /// Age after which request-log rows may be swept.
  pub fn log_retention(&self) -> TimeDelta {
    TimeDelta::hours(i64::from(self.log_retention_hours))
  }
}
