//! `?action=load` — return the blob stored under a code.

use axum::{http::StatusCode, response::Response};
use chrono::{DateTime, TimeDelta, Utc};
use cloudsave_core::{
  code::SaveCode,
  identity::Identity,
  log::{LogAction, RequestLogEntry},
  store::SaveStore,
};
use serde_json::json;

use crate::{AppState, error::ApiError, handlers::json_response};

pub async fn handler<S>(
  state:    &AppState<S>,
  identity: &Identity,
  code:     Option<&str>,
  now:      DateTime<Utc>,
) -> Result<Response, ApiError>
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let limits = &state.config.limits;

  // Malformed codes never reach the store, so they cannot feed the
  // failed-attempt counter either.
  let code = SaveCode::parse(code.unwrap_or_default()).map_err(|_| ApiError::InvalidCodeFormat)?;

  let since = now - TimeDelta::hours(1);

  // The current request is already in the log, so `max_loads_per_hour`
  // loads pass and the next one trips.
  let loads = state
    .store
    .count_actions_since(&identity.address, LogAction::Load, since)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if loads > limits.max_loads_per_hour {
    tracing::warn!(loads, "load throttled");
    return Err(ApiError::TooManyLoads);
  }

  let failed = state
    .store
    .count_actions_since(&identity.address, LogAction::LoadFailed, since)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if failed >= limits.max_failed_loads_per_hour {
    tracing::warn!(failed, "load throttled after failed lookups");
    return Err(ApiError::TooManyFailedLoads);
  }

  let blob = state
    .store
    .get_blob(&code, now - limits.expiry())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  match blob {
    Some(blob) => Ok(json_response(StatusCode::OK, &json!({ "success": true, "data": blob.data }))),
    None => {
      state
        .store
        .log_request(RequestLogEntry::new(
          identity.address.clone(),
          LogAction::LoadFailed,
          Utc::now(),
        ))
        .await
        .map_err(|e| ApiError::Store(Box::new(e)))?;
      Err(ApiError::SaveNotFound)
    }
  }
}
