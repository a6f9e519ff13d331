pub mod load;
pub mod options;
pub mod save;
pub mod verify;

use std::net::IpAddr;

use axum::{
  extract::Query,
  http::{HeaderValue, StatusCode, Uri, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use cloudsave_core::{
  log::{LogAction, RequestLogEntry},
  store::SaveStore,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{AppState, breaker, error::ApiError};

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

pub(crate) fn json_response(status: StatusCode, body: &Value) -> Response {
  (
    status,
    [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
    body.to_string(),
  )
    .into_response()
}

/// `?action=` selector shared by both endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
  pub action: Option<String>,
}

impl ActionQuery {
  /// The requested action. A query string that does not parse (a repeated
  /// `action`, say) reads as no action at all.
  pub fn from_uri(uri: &Uri) -> Self {
    Query::<Self>::try_from_uri(uri).map(|Query(q)| q).unwrap_or_default()
  }
}

/// Request body for the code store. Fields are optional; each action checks
/// the ones it needs.
#[derive(Debug, Default)]
pub struct CloudSaveBody {
  pub data:      Option<String>,
  pub device_id: Option<String>,
  pub code:      Option<String>,
}

impl CloudSaveBody {
  pub(crate) fn from_json(body: &Map<String, Value>) -> Self {
    Self {
      data:      string_field(body, "data"),
      device_id: text_field(body, "deviceId"),
      code:      text_field(body, "code"),
    }
  }
}

/// A body that is missing or not a JSON object reads as `{}`.
pub(crate) fn parse_body(bytes: &[u8]) -> Map<String, Value> {
  match serde_json::from_slice(bytes) {
    Ok(Value::Object(map)) => map,
    _ => Map::new(),
  }
}

/// Only a JSON string counts.
pub(crate) fn string_field(body: &Map<String, Value>, key: &str) -> Option<String> {
  match body.get(key) {
    Some(Value::String(s)) => Some(s.clone()),
    _ => None,
  }
}

/// A string, or the text form of a number or boolean. Each field is read on
/// its own, so one mistyped field never hides the others.
pub(crate) fn text_field(body: &Map<String, Value>, key: &str) -> Option<String> {
  match body.get(key)? {
    Value::String(s) => Some(s.clone()),
    v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
    _ => None,
  }
}

/// Code-store entry point: breaker, request log, then the action itself.
pub async fn cloud_saves<S>(
  state:  &AppState<S>,
  peer:   IpAddr,
  action: Option<&str>,
  body:   CloudSaveBody,
) -> Result<Response, ApiError>
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let now = Utc::now();
  breaker::check(state.store.as_ref(), &state.config.limits, now).await?;

  let identity = state.hasher.identify(peer, body.device_id.as_deref());
  let action = LogAction::from_request(action);

  state
    .store
    .log_request(RequestLogEntry::new(identity.address.clone(), action, now))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  match action {
    LogAction::Save => save::handler(state, &identity, body.data, now).await,
    LogAction::Load => load::handler(state, &identity, body.code.as_deref(), now).await,
    LogAction::LoadFailed | LogAction::Invalid => Err(ApiError::InvalidAction),
  }
}
