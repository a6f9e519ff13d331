//! CORS policy: echo the caller's origin only when it is on the allow-list.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build the CORS layer from configured origins.
///
/// Unparseable entries and the `*` wildcard are skipped with a warning. A non-matching `Origin`
/// gets no `Access-Control-Allow-Origin` header at all.
pub fn layer(allowed_origins: &[String]) -> CorsLayer {
  let origins: Vec<HeaderValue> = allowed_origins
    .iter()
    .filter_map(|origin| {
      if origin.trim() == "*" {
        tracing::warn!("ignoring wildcard allowed origin; list origins explicitly");
        return None;
      }
      match HeaderValue::from_str(origin) {
        Ok(v) => Some(v),
        Err(_) => {
          tracing::warn!(%origin, "ignoring unparseable allowed origin");
          None
        }
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(AllowOrigin::list(origins))
    .allow_methods([Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE])
}
