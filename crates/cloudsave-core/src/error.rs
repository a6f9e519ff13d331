//! Error types for `cloudsave-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid save code: {0:?}")]
  InvalidCode(String),

  #[error("unknown tier: {0:?}")]
  UnknownTier(String),

  #[error("identity secret must not be empty")]
  EmptySecret,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
