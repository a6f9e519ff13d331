//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order in SQL matches time order.

use chrono::{DateTime, SecondsFormat, Utc};
use cloudsave_core::{blob::SavedBlob, code::SaveCode, subscription::SubscriptionCode};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counts
// ───────────────────────────────────────────────────────────────────

/// SQLite hands back `COUNT(*)` as a signed integer.
pub fn decode_count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

// ─── Raw row types
// ────────────────────────────────────────────────────────────

/// Raw `saved_blobs` row before decoding.
pub struct RawSavedBlob {
  pub code:          String,
  pub data:          String,
  pub size_kb:       f64,
  pub address_hash:  String,
  pub device_hash:   Option<String>,
  pub combined_hash: String,
  pub created_at:    String,
}

impl RawSavedBlob {
  pub fn into_blob(self) -> Result<SavedBlob> {
    Ok(SavedBlob {
      code:          SaveCode::parse(&self.code)?,
      data:          self.data,
      size_kb:       self.size_kb,
      address_hash:  self.address_hash,
      device_hash:   self.device_hash,
      combined_hash: self.combined_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw `subscription_codes` row; the tier stays unparsed on purpose.
pub struct RawSubscription {
  pub code:      String,
  pub tier:      String,
  pub is_active: bool,
}

impl From<RawSubscription> for SubscriptionCode {
  fn from(raw: RawSubscription) -> Self {
    SubscriptionCode { code: raw.code, tier: raw.tier, is_active: raw.is_active }
  }
}
