//! Error types and axum `IntoResponse` implementation.
//!
//! Every failure is rendered as `{"success": false, "error": "..."}`. Store
//! failures are logged with their source and reported with a generic message.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cloudsave_core::subscription::Tier;
use serde_json::json;
use thiserror::Error;

use crate::handlers::json_response;

/// Body of the overload response; shown to players as-is.
const OFFLINE_MESSAGE: &str =
  "The database is offline for 1 hour due to potentially fraudulent usage by some users.";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Method not allowed")]
  MethodNotAllowed,
  #[error("Invalid action")]
  InvalidAction,
  #[error("Request body too large")]
  BodyTooLarge,

  // ── Code store ────────────────────────────────────────────────────────────
  #[error("No save data provided")]
  NoSaveData,
  #[error("Save too large")]
  SaveTooLarge,
  #[error("Too many saves. Please wait before saving again.")]
  TooManySaves,
  #[error("Could not generate code")]
  CodeGeneration,
  #[error("Invalid code format")]
  InvalidCodeFormat,
  #[error("Too many requests. Please wait before trying again.")]
  TooManyLoads,
  #[error("Too many failed attempts. Please wait before trying again.")]
  TooManyFailedLoads,
  #[error("Save not found")]
  SaveNotFound,
  #[error("api.offline")]
  Offline,

  // ── Subscription verifier ─────────────────────────────────────────────────
  #[error("No code provided")]
  NoCode,
  #[error("Invalid tier")]
  InvalidTier,
  #[error("Invalid code")]
  InvalidCode,
  #[error("Code expired")]
  CodeExpired,
  #[error("Tier insufficient")]
  TierInsufficient { code_tier: Tier, required_tier: Tier },
  #[error("Invalid tier in database")]
  CorruptTier(String),

  #[error("Database error")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::InvalidAction
      | ApiError::NoSaveData
      | ApiError::SaveTooLarge
      | ApiError::InvalidCodeFormat
      | ApiError::NoCode
      | ApiError::InvalidTier => StatusCode::BAD_REQUEST,
      ApiError::TooManySaves | ApiError::TooManyLoads | ApiError::TooManyFailedLoads => {
        StatusCode::TOO_MANY_REQUESTS
      }
      ApiError::SaveNotFound => StatusCode::NOT_FOUND,
      ApiError::InvalidCode | ApiError::CodeExpired => StatusCode::UNAUTHORIZED,
      ApiError::TierInsufficient { .. } => StatusCode::FORBIDDEN,
      ApiError::Offline => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::CodeGeneration | ApiError::CorruptTier(_) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      ApiError::Offline => json!({
        "success": false,
        "error":   self.to_string(),
        "message": OFFLINE_MESSAGE,
      }),
      ApiError::TierInsufficient { code_tier, required_tier } => json!({
        "success":      false,
        "error":        self.to_string(),
        "codeTier":     code_tier,
        "requiredTier": required_tier,
      }),
      ApiError::CorruptTier(stored) => {
        tracing::error!(tier = %stored, "subscription row holds an unknown tier");
        json!({ "success": false, "error": self.to_string() })
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        json!({ "success": false, "error": self.to_string() })
      }
      _ => json!({ "success": false, "error": self.to_string() }),
    };
    json_response(status, &body)
  }
}
