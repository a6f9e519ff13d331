//! The request log. Append-only rows backing every sliding-window count.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a logged request was doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
  Save,
  Load,
  /// A well-formed code that matched no stored blob.
  LoadFailed,
  /// An unrecognised `action` parameter; still counted for global volume.
  Invalid,
}

impl LogAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Save => "save",
      Self::Load => "load",
      Self::LoadFailed => "load_failed",
      Self::Invalid => "invalid",
    }
  }

  /// Map a client-supplied `action` parameter; only `save` and `load` can be
  /// requested, anything else is [`LogAction::Invalid`].
  pub fn from_request(action: Option<&str>) -> Self {
    match action {
      Some("save") => Self::Save,
      Some("load") => Self::Load,
      _ => Self::Invalid,
    }
  }
}

impl fmt::Display for LogAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One request-log row. Rows are inserted and swept, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogEntry {
  pub identity_hash: String,
  pub action:        LogAction,
  pub created_at:    DateTime<Utc>,
}

impl RequestLogEntry {
  pub fn new(identity_hash: impl Into<String>, action: LogAction, created_at: DateTime<Utc>) -> Self {
    Self { identity_hash: identity_hash.into(), action, created_at }
  }
}
