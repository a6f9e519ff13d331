//! Global circuit breaker over the request log.
//!
//! Stateless: every check is a live count of recent log rows. A tripped
//! breaker rejects the request before it is logged, so the rejection itself
//! never extends the outage.

use chrono::{DateTime, TimeDelta, Utc};
use cloudsave_core::{limits::Limits, store::SaveStore};

use crate::error::ApiError;

/// Fail with [`ApiError::Offline`] when the trailing minute or hour holds at
/// least its configured ceiling of requests.
pub async fn check<S>(store: &S, limits: &Limits, now: DateTime<Utc>) -> Result<(), ApiError>
where
  S: SaveStore,
{
  let per_minute = store
    .count_requests_since(now - TimeDelta::minutes(1))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let per_hour = store
    .count_requests_since(now - TimeDelta::hours(1))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if per_minute >= limits.global_max_requests_per_minute
    || per_hour >= limits.global_max_requests_per_hour
  {
    tracing::warn!(per_minute, per_hour, "circuit breaker open");
    return Err(ApiError::Offline);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use cloudsave_core::log::{LogAction, RequestLogEntry};
  use cloudsave_store_sqlite::SqliteStore;

  use super::*;

  async fn store_with(rows: &[TimeDelta], now: DateTime<Utc>) -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for age in rows {
      store
        .log_request(RequestLogEntry::new("caller", LogAction::Load, now - *age))
        .await
        .unwrap();
    }
    store
  }

  fn limits(per_minute: u64, per_hour: u64) -> Limits {
    Limits {
      global_max_requests_per_minute: per_minute,
      global_max_requests_per_hour: per_hour,
      ..Limits::default()
    }
  }

  #[tokio::test]
  async fn closed_below_both_ceilings() {
    let now = Utc::now();
    let store = store_with(&[TimeDelta::seconds(1), TimeDelta::minutes(10)], now).await;
    assert!(check(&store, &limits(2, 3), now).await.is_ok());
  }

  #[tokio::test]
  async fn minute_ceiling_trips() {
    let now = Utc::now();
    let store = store_with(&[TimeDelta::seconds(1), TimeDelta::seconds(2)], now).await;
    assert!(matches!(check(&store, &limits(2, 100), now).await, Err(ApiError::Offline)));
  }

  #[tokio::test]
  async fn hour_ceiling_trips_on_older_traffic() {
    let now = Utc::now();
    let ages = [TimeDelta::minutes(5), TimeDelta::minutes(20), TimeDelta::minutes(50)];
    let store = store_with(&ages, now).await;
    assert!(matches!(check(&store, &limits(100, 3), now).await, Err(ApiError::Offline)));
  }

  #[tokio::test]
  async fn traffic_outside_the_hour_is_ignored() {
    let now = Utc::now();
    let ages = [TimeDelta::hours(2), TimeDelta::hours(3), TimeDelta::hours(4)];
    let store = store_with(&ages, now).await;
    assert!(check(&store, &limits(1, 1), now).await.is_ok());
  }
}
