//! Handlers for `/login` and `/logout`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/login` | Body: `{"name":"…","password":"…"}`; sets header and cookie |
//! | `GET`  | `/logout` | Clears the cookie; 204 |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::IntoResponse,
};
use shutter_core::store::Store;

use crate::{
  AppState,
  dto::{LoginBody, UserDto},
  error::ApiError,
  extract::ApiJson,
};

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let user = match state.users().authenticate(&body.name, &body.password).await {
    Ok(user) => user,
    Err(e) => {
      tracing::warn!(name = %body.name, "failed login");
      return Err(e);
    }
  };

  let token = state.auth.issue(&user)?;
  let mut headers = HeaderMap::new();
  headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
  headers.insert(header::SET_COOKIE, header_value(&state.auth.session_cookie(&token))?);

  tracing::info!(user_id = %user.id, "logged in");
  Ok((headers, Json(UserDto::from(user))))
}

/// `GET /logout`
pub async fn logout<S>(State(state): State<AppState<S>>) -> Result<impl IntoResponse, ApiError>
where
  S: Store + 'static,
{
  let cookie = header_value(&state.auth.expired_cookie())?;
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
  HeaderValue::from_str(value).map_err(|e| ApiError::Internal(e.to_string()))
}
