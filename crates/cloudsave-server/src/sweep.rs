//! Scheduled expiry sweep.
//!
//! Runs on a fixed interval instead of piggy-backing on requests. It only
//! deletes rows already past their retention window, so in-flight reads never
//! see a row vanish that they could still have returned.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use cloudsave_core::{
  limits::Limits,
  store::{SaveStore, SweepReport},
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Delete expired blobs and request-log rows older than the retention window.
pub async fn sweep_once<S>(
  store:  &S,
  limits: &Limits,
  now:    DateTime<Utc>,
) -> Result<SweepReport, S::Error>
where
  S: SaveStore,
{
  store.sweep(now - limits.expiry(), now - limits.log_retention()).await
}

/// Spawn the background sweeper. The first sweep runs immediately.
pub fn spawn<S>(store: Arc<S>, limits: Limits, every: Duration) -> JoinHandle<()>
where
  S: SaveStore + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      let report = match sweep_once(store.as_ref(), &limits, Utc::now()).await {
        Ok(report) => report,
        Err(e) => {
          tracing::error!(error = %e, "expiry sweep failed");
          continue;
        }
      };
      match store.count_blobs().await {
        Ok(remaining) => tracing::info!(
          blobs = report.blobs,
          requests = report.requests,
          remaining,
          capacity = limits.max_saves_total,
          "expiry sweep complete"
        ),
        Err(e) => tracing::warn!(
          blobs = report.blobs,
          requests = report.requests,
          error = %e,
          "expiry sweep complete; could not count remaining saves"
        ),
      }
    }
  })
}
