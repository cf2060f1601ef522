//! Error type for `shutter-media`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported media type: {0}")]
  UnsupportedMediaType(String),

  #[error("no stored file for photo {0}")]
  NotFound(Uuid),

  #[error("image error: {0}")]
  Image(#[from] image::ImageError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("blocking task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
