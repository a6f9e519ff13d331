//! HTTP layer for cloudsave.
//!
//! Exposes an axum [`Router`] with two POST endpoints backed by any
//! [`SaveStore`]:
//!
//! | Path | Actions |
//! |------|---------|
//! | `/cloud-saves` | `?action=save`, `?action=load` |
//! | `/verify-code` | `?action=verify` |
//!
//! The router reads the caller's address from [`ConnectInfo`]; serve it with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod admin;
pub mod breaker;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod sweep;

pub use error::ApiError;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::{ConnectInfo, Request, State},
  http::Method,
  response::{IntoResponse, Response},
  routing::any,
};
use bytes::Bytes;
use cloudsave_core::{identity::IdentityHasher, limits::Limits, store::SaveStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{ActionQuery, CloudSaveBody, options, parse_body, verify};

/// Room for the JSON envelope around the save payload.
const ENVELOPE_BYTES: u64 = 64 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// HMAC key for identity hashing. Never written to the store.
  pub identity_secret:     String,
  #[serde(default)]
  pub allowed_origins:     Vec<String>,
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
  #[serde(default)]
  pub limits:              Limits,
}

fn default_sweep_interval_secs() -> u64 { 3600 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: SaveStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub hasher: Arc<IdentityHasher>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for both endpoints.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let cors = cors::layer(&state.config.allowed_origins);

  Router::new()
    .route("/cloud-saves", any(cloud_saves_handler::<S>))
    .route("/verify-code", any(verify_code_handler::<S>))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Dispatch helpers ────────────────────────────────────────────────────────

/// `Some(response)` when the method gate has already answered the request.
fn method_gate(method: &Method) -> Option<Response> {
  match *method {
    Method::POST => None,
    Method::OPTIONS => Some(options::handler()),
    _ => Some(ApiError::MethodNotAllowed.into_response()),
  }
}

/// Largest request body read off the wire.
///
/// JSON escaping can grow a payload up to six-fold (`\u00XX`), so a save
/// right at `max_save_size_kb` always fits.
fn body_limit(limits: &Limits) -> usize {
  let bytes = limits.max_save_bytes().saturating_mul(6).saturating_add(ENVELOPE_BYTES);
  usize::try_from(bytes).unwrap_or(usize::MAX)
}

async fn collect_body(req: Request<Body>, limit: usize, overflow: ApiError) -> Result<Bytes, Response> {
  axum::body::to_bytes(req.into_body(), limit)
    .await
    .map_err(|_| overflow.into_response())
}

// ─── Route handlers ──────────────────────────────────────────────────────────

async fn cloud_saves_handler<S>(
  State(state): State<AppState<S>>,
  ConnectInfo(peer): ConnectInfo<SocketAddr>,
  req: Request<Body>,
) -> Response
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if let Some(r) = method_gate(req.method()) { return r; }
  let query = ActionQuery::from_uri(req.uri());
  let limit = body_limit(&state.config.limits);
  // Only an oversized save can overflow the limit.
  let bytes = match collect_body(req, limit, ApiError::SaveTooLarge).await {
    Ok(b) => b,
    Err(e) => return e,
  };
  let body = CloudSaveBody::from_json(&parse_body(&bytes));
  handlers::cloud_saves(&state, peer.ip(), query.action.as_deref(), body)
    .await
    .into_response_or_err()
}

async fn verify_code_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: SaveStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if let Some(r) = method_gate(req.method()) { return r; }
  let query = ActionQuery::from_uri(req.uri());
  let limit = body_limit(&state.config.limits);
  let bytes = match collect_body(req, limit, ApiError::BodyTooLarge).await {
    Ok(b) => b,
    Err(e) => return e,
  };
  match query.action.as_deref() {
    Some("verify") => {
      let body = verify::VerifyBody::from_json(&parse_body(&bytes));
      verify::handler(&state, body).await.into_response_or_err()
    }
    _ => ApiError::InvalidAction.into_response(),
  }
}

// ─── Helper trait ────────────────────────────────────────────────────────────

trait IntoResponseOrErr {
  fn into_response_or_err(self) -> Response;
}

impl IntoResponseOrErr for Result<Response, ApiError> {
  fn into_response_or_err(self) -> Response {
    match self {
      Ok(r)  => r,
      Err(e) => e.into_response(),
    }
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
