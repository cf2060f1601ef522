//! Extractors whose rejections are rendered as [`ApiError`] DTOs.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use shutter_core::page::PageRequest;

use crate::error::ApiError;

/// [`axum::Json`] with a `bad_request` rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`axum::extract::Query`] with a `bad_request` rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// [`axum::extract::Path`] with a `bad_request` rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `?page=&size=` of every list endpoint; defaults to the first ten items.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page: Option<u32>,
  pub size: Option<u32>,
}

impl PageParams {
  pub fn request(&self) -> Result<PageRequest, ApiError> {
    let default = PageRequest::default();
    Ok(PageRequest::new(
      self.page.unwrap_or(default.number()),
      self.size.unwrap_or(default.size()),
    )?)
  }
}
