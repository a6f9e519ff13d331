//! `?action=save` — store a blob and hand back a fresh code.

use axum::{http::StatusCode, response::Response};
use chrono::{DateTime, TimeDelta, Utc};
use cloudsave_core::{
  blob::{SavedBlob, size_kb},
  code::{MAX_GENERATION_ATTEMPTS, SaveCode},
  identity::Identity,
  store::{InsertOutcome, SaveOwner, SaveStore},
};
use rand_core::OsRng;
use serde_json::json;

use crate::{AppState, error::ApiError, handlers::json_response};

pub async fn handler<S>(
  state:    &AppState<S>,
  identity: &Identity,
  data:     Option<String>,
  now:      DateTime<Utc>,
) -> Result<Response, ApiError>
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let limits = &state.config.limits;

  let data = data.filter(|d| !d.is_empty()).ok_or(ApiError::NoSaveData)?;
  if data.len() as u64 > limits.max_save_bytes() {
    return Err(ApiError::SaveTooLarge);
  }

  // Take the busier of the two buckets: catches both address hoppers and
  // callers that reset their device token.
  let since = now - TimeDelta::hours(1);
  let by_address = state
    .store
    .count_saves_since(SaveOwner::Address(&identity.address), since)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let by_device = match identity.device.as_deref() {
    Some(device) => state
      .store
      .count_saves_since(SaveOwner::Device(device), since)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?,
    None => 0,
  };
  if by_address.max(by_device) >= limits.max_saves_per_hour {
    tracing::warn!(by_address, by_device, "save throttled");
    return Err(ApiError::TooManySaves);
  }

  let blob = SavedBlob {
    code:          SaveCode::generate(&mut OsRng),
    size_kb:       size_kb(data.len()),
    data,
    address_hash:  identity.address.clone(),
    device_hash:   identity.device.clone(),
    combined_hash: identity.combined.clone(),
    created_at:    now,
  };

  let code = issue(state.store.as_ref(), blob, limits.max_saves_total, || {
    SaveCode::generate(&mut OsRng)
  })
  .await?;

  Ok(json_response(StatusCode::OK, &json!({ "success": true, "code": code })))
}

/// Insert `blob`, drawing a new code from `next_code` each time the store
/// reports a clash. Gives up after [`MAX_GENERATION_ATTEMPTS`] tries.
pub(crate) async fn issue<S>(
  store:         &S,
  mut blob:      SavedBlob,
  capacity:      u64,
  mut next_code: impl FnMut() -> SaveCode,
) -> Result<SaveCode, ApiError>
where
  S: SaveStore,
{
  for attempt in 1..=MAX_GENERATION_ATTEMPTS {
    let outcome = store
      .insert_blob(&blob, capacity)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;

    match outcome {
      InsertOutcome::Inserted { evicted } => {
        if let Some(evicted) = evicted {
          tracing::info!(%evicted, "store at capacity; evicted oldest save");
        }
        return Ok(blob.code);
      }
      InsertOutcome::CodeTaken => {
        tracing::debug!(attempt, code = %blob.code, "code collision");
        blob.code = next_code();
      }
    }
  }

  tracing::error!(attempts = MAX_GENERATION_ATTEMPTS, "could not find a free save code");
  Err(ApiError::CodeGeneration)
}
