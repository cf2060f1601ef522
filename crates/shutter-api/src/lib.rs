//! JSON REST API for Shutter.
//!
//! Exposes an axum [`Router`] backed by any [`shutter_core::store::Store`]
//! and a [`MediaStore`]. Every route but `/login` and `/logout` requires a
//! session token (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", shutter_api::api_router(state))
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod service;


use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use shutter_core::store::Store;
use shutter_media::MediaStore;

pub use auth::{AuthConfig, CurrentUser};
pub use error::ApiError;
use service::{AlbumService, PersonService, PhotoService, UserService};

/// Largest accepted request body, uploads included.
pub const MAX_UPLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Everything a handler needs.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub media: MediaStore,
  pub auth:  Arc<AuthConfig>,
}

// Manual impl: `S` itself does not need to be `Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      media: self.media.clone(),
      auth:  Arc::clone(&self.auth),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(store: Arc<S>, media: MediaStore, auth: AuthConfig) -> Self {
    Self { store, media, auth: Arc::new(auth) }
  }

  pub fn users(&self) -> UserService<'_, S> { UserService::new(&*self.store) }

  pub fn albums(&self) -> AlbumService<'_, S> { AlbumService::new(&*self.store) }

  pub fn photos(&self) -> PhotoService<'_, S> {
    PhotoService::new(&*self.store, &self.media)
  }

  pub fn people(&self) -> PersonService<'_, S> { PersonService::new(&*self.store) }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: Store + 'static,
{
  use handlers::{albums, people, photos, session, users};

  Router::new()
    // Session
    .route("/login", post(session::login::<S>))
    .route("/logout", get(session::logout::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route("/users/me", get(users::me))
    .route("/users/me/password", put(users::update_password::<S>))
    .route("/users/{id}", get(users::get_one::<S>).delete(users::delete_one::<S>))
    // Albums
    .route("/albums", get(albums::list::<S>).post(albums::create::<S>))
    .route(
      "/albums/{id}",
      get(albums::get_one::<S>)
        .put(albums::update_one::<S>)
        .delete(albums::delete_one::<S>),
    )
    .route(
      "/albums/{id}/photos",
      get(albums::photos::<S>)
        .put(albums::add_photos::<S>)
        .delete(albums::remove_photos::<S>),
    )
    .route(
      "/albums/{id}/permissions",
      get(albums::permissions::<S>).put(albums::update_permissions::<S>),
    )
    // Photos
    .route("/photos", get(photos::list::<S>).post(photos::upload::<S>))
    .route(
      "/photos/{id}",
      get(photos::get_one::<S>)
        .put(photos::update_one::<S>)
        .delete(photos::delete_one::<S>),
    )
    .route("/photos/{id}/raw", get(photos::raw::<S>))
    .route("/photos/{id}/compressed", get(photos::compressed::<S>))
    .route("/photos/{id}/transform", put(photos::transform::<S>))
    .route(
      "/photos/{id}/people",
      get(photos::people::<S>).put(photos::update_people::<S>),
    )
    .route(
      "/photos/{id}/permissions",
      get(photos::permissions::<S>).put(photos::update_permissions::<S>),
    )
    // People
    .route("/people", get(people::list::<S>).post(people::create::<S>))
    .route(
      "/people/{id}",
      get(people::get_one::<S>)
        .put(people::update_one::<S>)
        .delete(people::delete_one::<S>),
    )
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
    .with_state(state)
}
