//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the API as a JSON body tagged with a `code`, e.g.
//! `{"code":"duplicate","existingId":"…"}`.

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{
    multipart::{MultipartError, MultipartRejection},
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("bad credentials")]
  BadCredentials,

  #[error("unauthorized")]
  Unauthorized,

  #[error("invalid or expired token")]
  BadJwt,

  #[error("forbidden")]
  Forbidden,

  #[error("entity {0} not found")]
  EntityNotFound(Uuid),

  #[error("resources not found: {0:?}")]
  ResourcesNotFound(BTreeSet<Uuid>),

  #[error("user already exists: {0}")]
  UserAlreadyExists(Uuid),

  #[error("photo already uploaded: {0}")]
  PhotoAlreadyUploaded(Uuid),

  #[error("person already exists: {0}")]
  PersonAlreadyExists(Uuid),

  #[error("unsupported media type: {0}")]
  UnsupportedMediaType(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("media error: {0}")]
  Media(#[source] shutter_media::Error),
}

impl ApiError {
  /// Wrap a backend error; used as `.map_err(ApiError::store)`.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::BadCredentials | ApiError::Unauthorized | ApiError::BadJwt => {
        StatusCode::UNAUTHORIZED
      }
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::EntityNotFound(_) | ApiError::ResourcesNotFound(_) => {
        StatusCode::NOT_FOUND
      }
      ApiError::UserAlreadyExists(_)
      | ApiError::PhotoAlreadyUploaded(_)
      | ApiError::PersonAlreadyExists(_) => StatusCode::CONFLICT,
      ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      ApiError::Internal(_) | ApiError::Store(_) | ApiError::Media(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn dto(&self) -> ErrorDto<'_> {
    match self {
      ApiError::BadRequest(message) => ErrorDto::BadRequest { message },
      ApiError::BadCredentials => ErrorDto::BadCredentials,
      ApiError::Unauthorized => ErrorDto::Unauthorized,
      ApiError::BadJwt => ErrorDto::BadJwt,
      ApiError::Forbidden => ErrorDto::Forbidden,
      ApiError::EntityNotFound(id) => ErrorDto::NotFound { id: *id },
      ApiError::ResourcesNotFound(ids) => ErrorDto::ResourcesNotFound { ids },
      ApiError::UserAlreadyExists(existing_id)
      | ApiError::PhotoAlreadyUploaded(existing_id)
      | ApiError::PersonAlreadyExists(existing_id) => {
        ErrorDto::Duplicate { existing_id: *existing_id }
      }
      ApiError::UnsupportedMediaType(content_type) => {
        ErrorDto::UnsupportedMediaType { content_type }
      }
      ApiError::Internal(_) | ApiError::Store(_) | ApiError::Media(_) => {
        ErrorDto::InternalServerError
      }
    }
  }
}

/// Wire form of an [`ApiError`].
#[derive(Debug, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
enum ErrorDto<'a> {
  BadRequest {
    message: &'a str,
  },
  BadCredentials,
  Unauthorized,
  BadJwt,
  Forbidden,
  NotFound {
    id: Uuid,
  },
  ResourcesNotFound {
    ids: &'a BTreeSet<Uuid>,
  },
  Duplicate {
    #[serde(rename = "existingId")]
    existing_id: Uuid,
  },
  UnsupportedMediaType {
    #[serde(rename = "contentType")]
    content_type: &'a str,
  },
  InternalServerError,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::debug!(error = %self, "request rejected");
    }
    (status, Json(self.dto())).into_response()
  }
}

impl From<shutter_core::Error> for ApiError {
  fn from(e: shutter_core::Error) -> Self {
    match e {
      shutter_core::Error::InvalidPageRequest(_)
      | shutter_core::Error::InvalidRotation(_) => ApiError::BadRequest(e.to_string()),
      other => ApiError::Internal(other.to_string()),
    }
  }
}

impl From<shutter_media::Error> for ApiError {
  fn from(e: shutter_media::Error) -> Self {
    match e {
      shutter_media::Error::UnsupportedMediaType(content_type) => {
        ApiError::UnsupportedMediaType(content_type)
      }
      shutter_media::Error::Image(e) => {
        ApiError::BadRequest(format!("undecodable image: {e}"))
      }
      other => ApiError::Media(other),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<MultipartError> for ApiError {
  fn from(e: MultipartError) -> Self { ApiError::BadRequest(e.body_text()) }
}
