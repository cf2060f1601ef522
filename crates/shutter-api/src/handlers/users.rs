//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/me` | The caller |
//! | `PUT`    | `/users/me/password` | Body: `{"currentPassword":"…","newPassword":"…"}` |
//! | `GET`    | `/users` | Paged, by name |
//! | `POST`   | `/users` | Admin only; 201 |
//! | `GET`    | `/users/{id}` | |
//! | `DELETE` | `/users/{id}` | Admin only, never oneself |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use shutter_core::{page::Page, store::Store};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  dto::{CreateUserBody, PasswordBody, UserDto},
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery, PageParams},
};

/// `GET /users/me`
pub async fn me(actor: CurrentUser) -> Json<UserDto> { Json(actor.user.into()) }

/// `PUT /users/me/password`
pub async fn update_password<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiJson(body): ApiJson<PasswordBody>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state
    .users()
    .update_password(&actor, &body.current_password, &body.new_password)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _actor: CurrentUser,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<UserDto>>, ApiError>
where
  S: Store + 'static,
{
  let page = state.users().list(params.request()?).await?;
  Ok(Json(page.map(UserDto::from)))
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiJson(body): ApiJson<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let user = state
    .users()
    .create(&actor, &body.name, &body.password, body.role)
    .await?;
  Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserDto>, ApiError>
where
  S: Store + 'static,
{
  let user = state.users().get(id).await?;
  Ok(Json(user.into()))
}

/// `DELETE /users/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  actor: CurrentUser,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: Store + 'static,
{
  state.users().delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
