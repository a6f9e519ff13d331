//! OPTIONS handler — a bare preflight that the CORS layer did not answer.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

pub fn handler() -> Response { StatusCode::OK.into_response() }
