//! Out-of-band subscription provisioning used by the binary's helper modes.

use std::io::Write;

use anyhow::Context as _;
use cloudsave_core::{
  store::SaveStore,
  subscription::{SubscriptionCode, Tier, normalize_code},
};

/// Grant each `(code, tier)`, then revoke each code, reporting to `out`.
///
/// A line is written only once its change is in the store; the first failure
/// stops the run.
pub async fn apply<S>(
  store:   &S,
  grants:  &[(String, Tier)],
  revokes: &[String],
  out:     &mut impl Write,
) -> anyhow::Result<()>
where
  S: SaveStore,
{
  for (code, tier) in grants {
    let sub = SubscriptionCode::new(code, *tier);
    let normalised = sub.code.clone();
    store.put_subscription(sub).await.context("failed to grant code")?;
    writeln!(out, "granted {normalised} ({tier})")?;
  }

  for code in revokes {
    let found = store
      .deactivate_subscription(code)
      .await
      .context("failed to revoke code")?;
    if found {
      writeln!(out, "revoked {}", normalize_code(code))?;
    } else {
      writeln!(out, "no such code: {code}")?;
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::{DateTime, Utc};
  use cloudsave_core::{
    blob::SavedBlob,
    code::SaveCode,
    log::{LogAction, RequestLogEntry},
    store::{InsertOutcome, SaveOwner, SweepReport},
  };
  use cloudsave_store_sqlite::SqliteStore;

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("store offline")]
  struct Offline;

  /// Fails every call.
  struct OfflineStore;

  impl SaveStore for OfflineStore {
    type Error = Offline;

    async fn log_request(&self, _: RequestLogEntry) -> Result<(), Offline> { Err(Offline) }

    async fn count_requests_since(&self, _: DateTime<Utc>) -> Result<u64, Offline> { Err(Offline) }

    async fn count_actions_since(
      &self,
      _: &str,
      _: LogAction,
      _: DateTime<Utc>,
    ) -> Result<u64, Offline> {
      Err(Offline)
    }

    async fn count_saves_since(&self, _: SaveOwner<'_>, _: DateTime<Utc>) -> Result<u64, Offline> {
      Err(Offline)
    }

    async fn count_blobs(&self) -> Result<u64, Offline> { Err(Offline) }

    async fn insert_blob(&self, _: &SavedBlob, _: u64) -> Result<InsertOutcome, Offline> {
      Err(Offline)
    }

    async fn get_blob(&self, _: &SaveCode, _: DateTime<Utc>) -> Result<Option<SavedBlob>, Offline> {
      Err(Offline)
    }

    async fn sweep(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> Result<SweepReport, Offline> {
      Err(Offline)
    }

    async fn get_subscription(&self, _: &str) -> Result<Option<SubscriptionCode>, Offline> {
      Err(Offline)
    }

    async fn put_subscription(&self, _: SubscriptionCode) -> Result<(), Offline> { Err(Offline) }

    async fn deactivate_subscription(&self, _: &str) -> Result<bool, Offline> { Err(Offline) }
  }

  #[tokio::test]
  async fn grant_and_revoke_report_after_writing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut out = Vec::new();
    apply(
      &store,
      &[(" vip2024 ".to_string(), Tier::Gold)],
      &["vip2024".to_string(), "ghost".to_string()],
      &mut out,
    )
    .await
    .unwrap();

    let sub = store.get_subscription("VIP2024").await.unwrap().unwrap();
    assert_eq!(sub.tier().unwrap(), Tier::Gold);
    assert!(!sub.is_active);
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "granted VIP2024 (GOLD)\nrevoked VIP2024\nno such code: ghost\n"
    );
  }

  #[tokio::test]
  async fn failed_grant_reports_nothing() {
    let mut out = Vec::new();
    let result = apply(&OfflineStore, &[("VIP".to_string(), Tier::Bronze)], &[], &mut out).await;
    assert!(result.is_err());
    assert!(out.is_empty());
  }

  #[tokio::test]
  async fn failed_revoke_reports_nothing() {
    let mut out = Vec::new();
    let result = apply(&OfflineStore, &[], &["VIP".to_string()], &mut out).await;
    assert!(result.is_err());
    assert!(out.is_empty());
  }
}
