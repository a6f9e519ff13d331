//! Saved blobs: opaque payloads addressed by a [`SaveCode`].
//!
//! A blob is written once and never updated. It leaves the store only through
//! the expiry sweep or capacity eviction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::SaveCode;

/// A stored save together with the hashed identities that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBlob {
  pub code:          SaveCode,
  /// The caller's payload, returned verbatim on load.
  pub data:          String,
  pub size_kb:       f64,
  pub address_hash:  String,
  pub device_hash:   Option<String>,
  pub combined_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Payload size in KiB, rounded to two decimals.
pub fn size_kb(len: usize) -> f64 { (len as f64 / 1024.0 * 100.0).round() / 100.0 }
