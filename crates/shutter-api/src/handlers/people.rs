//! Handlers for `/people` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/people` | Paged, by last then first name |
//! | `POST`   | `/people` | Body: `{"lastName":"…","firstName":"…"}`; 201 |
//! | `GET`    | `/people/{id}` | |
//! | `PUT`    | `/people/{id}` | |
//! | `DELETE` | `/people/{id}` | Admin only |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use shutter_core::{page::Page, store::Store};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  dto::{PersonBody, PersonDto},
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, PageParams},
};

/// `GET /people`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _actor: CurrentUser,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<PersonDto>>, ApiError>
where
  S: Store + 'static,
{
  let page = state.people().list(params.request()?).await?;
  Ok(Json(page.map(PersonDto::from)))
}

/// `POST /people`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiJson(body): ApiJson<PersonBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let person = state
    .people()
    .create(&actor, &body.last_name, &body.first_name)
    .await?;
  Ok((StatusCode::CREATED, Json(PersonDto::from(person))))
}

/// `GET /people/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PersonDto>, ApiError>
where
  S: Store + 'static,
{
  Ok(Json(state.people().get(id).await?.into()))
}

/// `PUT /people/{id}`
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PersonBody>,
) -> Result<Json<PersonDto>, ApiError>
where
  S: Store + 'static,
{
  let person = state
    .people()
    .update(&actor, id, &body.last_name, &body.first_name)
    .await?;
  Ok(Json(person.into()))
}

/// `DELETE /people/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.people().delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
