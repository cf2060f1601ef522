//! Handlers for `/photos` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/photos` | Paged; photos the caller can read |
//! | `POST`   | `/photos` | multipart, field `file`; 201 |
//! | `GET`    | `/photos/{id}` | |
//! | `PUT`    | `/photos/{id}` | Body: `{"shootingDate":"…"}` |
//! | `DELETE` | `/photos/{id}` | 204 |
//! | `GET`    | `/photos/{id}/raw` | The uploaded bytes |
//! | `GET`    | `/photos/{id}/compressed` | Bounded JPEG |
//! | `PUT`    | `/photos/{id}/transform` | Body: `{"type":"rotation","degrees":90}` |
//! | `GET`    | `/photos/{id}/people` | |
//! | `PUT`    | `/photos/{id}/people` | Body: `{"peopleToAdd":[…],"peopleToRemove":[…]}` |
//! | `GET`    | `/photos/{id}/permissions` | |
//! | `PUT`    | `/photos/{id}/permissions` | |

use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::{StatusCode, header},
  response::IntoResponse,
};
use shutter_core::{page::Page, permission::SubjectPermissions, store::Store};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  dto::{PeopleBody, PermissionsBody, PersonDto, PhotoBody, PhotoDto, TransformBody},
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, PageParams},
};

/// Name of the multipart field holding the upload.
pub const FILE_FIELD: &str = "file";

/// `GET /photos`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<PhotoDto>>, ApiError>
where
  S: Store + 'static,
{
  let page = state.photos().list(&actor, params.request()?).await?;
  Ok(Json(page.map(PhotoDto::from)))
}

/// `POST /photos`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let mut multipart = multipart?;
  let mut upload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(FILE_FIELD) {
      upload = Some(field.bytes().await?);
      break;
    }
  }
  let bytes = upload
    .ok_or_else(|| ApiError::BadRequest(format!("missing multipart field `{FILE_FIELD}`")))?;

  let photo = state.photos().upload(&actor, bytes.to_vec()).await?;
  Ok((StatusCode::CREATED, Json(PhotoDto::from(photo))))
}

/// `GET /photos/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PhotoDto>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.photos().get(&actor, id).await?.into()))
}

/// `PUT /photos/{id}`
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PhotoBody>,
) -> Result<Json<PhotoDto>, ApiError>
where
  S: Store + 'static,
{
  let photo = state.photos().update(&actor, id, body.shooting_date).await?;
  Ok(Json(photo.into()))
}

/// `DELETE /photos/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.photos().delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /photos/{id}/raw`
pub async fn raw<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let (photo, bytes) = state.photos().raw(&actor, id).await?;
  Ok(([(header::CONTENT_TYPE, photo.content_type)], bytes))
}

/// `GET /photos/{id}/compressed`
pub async fn compressed<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let (_, bytes) = state.photos().compressed(&actor, id).await?;
  Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

/// `PUT /photos/{id}/transform`
pub async fn transform<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<TransformBody>,
) -> Result<Json<PhotoDto>, ApiError>
where
  S: Store + 'static,
{
  let photo = match body {
    TransformBody::Rotation { degrees } => state.photos().rotate(&actor, id, degrees).await?,
  };
  Ok(Json(photo.into()))
}

/// `GET /photos/{id}/people`
pub async fn people<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<PersonDto>>, ApiError>
where
  S: Store + 'static,
{
  let people = state.photos().people(&actor, id).await?;
  Ok(Json(people.into_iter().map(PersonDto::from).collect()))
}

/// `PUT /photos/{id}/people`
pub async fn update_people<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PeopleBody>,
) -> Result<Json<Vec<PersonDto>>, ApiError>
where
  S: Store + 'static,
{
  let people = state
    .photos()
    .update_people(&actor, id, body.people_to_add, body.people_to_remove)
    .await?;
  Ok(Json(people.into_iter().map(PersonDto::from).collect()))
}

/// `GET /photos/{id}/permissions`
pub async fn permissions<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<SubjectPermissions>>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.photos().permissions(&actor, id).await?))
}

/// `PUT /photos/{id}/permissions`
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
    .photos()
    .update_permissions(&actor, id, body.permissions_to_add, body.permissions_to_remove)
    .await?;
  Ok(Json(permissions))
}
