//! Handlers for `/albums` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/albums` | Paged; albums the caller can read |
//! | `POST`   | `/albums` | Body: `{"name":"…"}`; 201 |
//! | `GET`    | `/albums/{id}` | |
//! | `PUT`    | `/albums/{id}` | Body: `{"name":"…"}` |
//! | `DELETE` | `/albums/{id}` | 204 |
//! | `GET`    | `/albums/{id}/photos` | Paged |
//! | `PUT`    | `/albums/{id}/photos` | Body: `{"photosIds":[…]}`; 204 |
//! | `DELETE` | `/albums/{id}/photos` | Body: `{"photosIds":[…]}`; 204 |
//! | `GET`    | `/albums/{id}/permissions` | |
//! | `PUT`    | `/albums/{id}/permissions` | Body: `{"permissionsToAdd":[…],"permissionsToRemove":[…]}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use shutter_core::{page::Page, permission::SubjectPermissions, store::Store};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  dto::{AlbumBody, AlbumDto, PermissionsBody, PhotoDto, PhotosIdsBody},
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, PageParams},
};

/// `GET /albums`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<AlbumDto>>, ApiError>
where
  S: Store + 'static,
{
  let page = state.albums().list(&actor, params.request()?).await?;
  Ok(Json(page.map(AlbumDto::from)))
}

/// `POST /albums`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiJson(body): ApiJson<AlbumBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let album = state.albums().create(&actor, &body.name).await?;
  Ok((StatusCode::CREATED, Json(AlbumDto::from(album))))
}

/// `GET /albums/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AlbumDto>, ApiError>
where
  S: Store + 'static,
{
  let album = state.albums().get(&actor, id).await?;
  Ok(Json(album.into()))
}

/// `PUT /albums/{id}`
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<AlbumBody>,
) -> Result<Json<AlbumDto>, ApiError>
where
  S: Store + 'static,
{
  let album = state.albums().rename(&actor, id, &body.name).await?;
  Ok(Json(album.into()))
}

/// `DELETE /albums/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.albums().delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /albums/{id}/photos`
pub async fn photos<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<PhotoDto>>, ApiError>
where
  S: Store + 'static,
{
  let page = state.albums().photos(&actor, id, params.request()?).await?;
  Ok(Json(page.map(PhotoDto::from)))
}

/// `PUT /albums/{id}/photos`
pub async fn add_photos<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PhotosIdsBody>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.albums().add_photos(&actor, id, body.photos_ids).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /albums/{id}/photos`
pub async fn remove_photos<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PhotosIdsBody>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.albums().remove_photos(&actor, id, body.photos_ids).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /albums/{id}/permissions`
pub async fn permissions<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<SubjectPermissions>>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.albums().permissions(&actor, id).await?))
}

/// `PUT /albums/{id}/permissions`
pub async fn update_permissions<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PermissionsBody>,
) -> Result<Json<Vec<SubjectPermissions>>, ApiError>
where
  S: Store + 'static,
{
  let permissions = state
    .albums()
    .update_permissions(&actor, id, body.permissions_to_add, body.permissions_to_remove)
    .await?;
  Ok(Json(permissions))
}
