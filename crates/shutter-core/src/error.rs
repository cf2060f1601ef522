//! Error types for `shutter-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown event kind discriminant: {0:?}")]
  UnknownEventKind(String),

  #[error("invalid page request: {0}")]
  InvalidPageRequest(String),

  #[error("rotation of {0} degrees is not a multiple of 90")]
  InvalidRotation(i32),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
