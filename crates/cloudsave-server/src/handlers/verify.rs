//! `?action=verify` — check a subscription code against a required tier.

use axum::{http::StatusCode, response::Response};
use cloudsave_core::{
  store::SaveStore,
  subscription::{Tier, normalize_code},
};
use serde_json::{Map, Value, json};

use crate::{
  AppState,
  error::ApiError,
  handlers::{json_response, text_field},
};

#[derive(Debug, Default)]
pub struct VerifyBody {
  pub code: Option<String>,
  pub tier: Option<String>,
}

impl VerifyBody {
  pub(crate) fn from_json(body: &Map<String, Value>) -> Self {
    Self { code: text_field(body, "code"), tier: text_field(body, "tier") }
  }
}

pub async fn handler<S>(state: &AppState<S>, body: VerifyBody) -> Result<Response, ApiError>
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let code = normalize_code(body.code.as_deref().unwrap_or_default());
  if code.is_empty() {
    return Err(ApiError::NoCode);
  }

  let required: Tier = body
    .tier
    .as_deref()
    .unwrap_or_default()
    .parse()
    .map_err(|_| ApiError::InvalidTier)?;

  let subscription = state
    .store
    .get_subscription(&code)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::InvalidCode)?;

  if !subscription.is_active {
    return Err(ApiError::CodeExpired);
  }

  let held = subscription
    .tier()
    .map_err(|_| ApiError::CorruptTier(subscription.tier.clone()))?;

  if held.satisfies(required) {
    Ok(json_response(
      StatusCode::OK,
      &json!({ "success": true, "tier": held, "tierLevel": held.power() }),
    ))
  } else {
    Err(ApiError::TierInsufficient { code_tier: held, required_tier: required })
  }
}
