//! The `SaveStore` trait and its supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `cloudsave-store-sqlite`). The server depends on this abstraction, not on
//! any concrete backend. Every rate limit is a count over timestamped rows, so
//! the store is the only place request handlers coordinate.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  blob::SavedBlob,
  code::SaveCode,
  log::{LogAction, RequestLogEntry},
  subscription::SubscriptionCode,
};

// ─── Supporting types ────────────────────────────────────────────────────────

/// Which hashed identity a save count is bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOwner<'a> {
  Address(&'a str),
  Device(&'a str),
}

/// Result of [`SaveStore::insert_blob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
  /// The blob was stored. `evicted` names the blob dropped to make room.
  Inserted { evicted: Option<SaveCode> },
  /// The code already exists; nothing was written or evicted.
  CodeTaken,
}

/// Rows removed by one [`SaveStore::sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub blobs:    u64,
  pub requests: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the cloudsave backing store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SaveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Request log ───────────────────────────────────────────────────────

  /// Append one row to the request log.
  fn log_request(
    &self,
    entry: RequestLogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Count every log row created strictly after `since`.
  fn count_requests_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Count log rows for one identity and action created strictly after
  /// `since`.
  fn count_actions_since<'a>(
    &'a self,
    identity_hash: &'a str,
    action: LogAction,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Saved blobs ───────────────────────────────────────────────────────

  /// Count blobs created strictly after `since` by the given owner.
  fn count_saves_since<'a>(
    &'a self,
    owner: SaveOwner<'a>,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Total stored blobs, expired-but-unswept rows included.
  fn count_blobs(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Atomically evict the oldest blob if the store holds `capacity` or more,
  /// then insert `blob`.
  ///
  /// Code uniqueness is enforced by the store itself. A clash yields
  /// [`InsertOutcome::CodeTaken`] and leaves the store untouched, eviction
  /// included.
  fn insert_blob<'a>(
    &'a self,
    blob: &'a SavedBlob,
    capacity: u64,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Fetch a blob by code, ignoring blobs created at or before
  /// `created_after` (already expired).
  fn get_blob<'a>(
    &'a self,
    code: &'a SaveCode,
    created_after: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<SavedBlob>, Self::Error>> + Send + 'a;

  /// Delete blobs created before `blobs_before` and log rows created before
  /// `requests_before`. Rows newer than the cutoffs are never touched.
  fn sweep(
    &self,
    blobs_before: DateTime<Utc>,
    requests_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<SweepReport, Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Look up a subscription by its normalised code.
  fn get_subscription<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<SubscriptionCode>, Self::Error>> + Send + 'a;

  /// Insert or replace a subscription entitlement.
  fn put_subscription(
    &self,
    subscription: SubscriptionCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark a subscription inactive. Returns `false` if the code is unknown.
  fn deactivate_subscription<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
