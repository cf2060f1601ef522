//! JWT authentication: password hashing, token issuance and the
//! [`CurrentUser`] extractor.
//!
//! A token is accepted from the `Authorization: Bearer` header first and the
//! `Authorization` cookie second, so both API clients and browsers work.

use std::{
  net::{IpAddr, SocketAddr},
  sync::LazyLock,
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{ConnectInfo, FromRequestParts},
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use shutter_core::{
  entity::{Role, User},
  event::EventSource,
  store::Store,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Name of the session cookie, mirroring the header it stands in for.
pub const COOKIE_NAME: &str = "Authorization";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Hash checked when a login names an unknown user, so both failures cost
/// one argon2 verification.
static DUMMY_HASH: LazyLock<String> =
  LazyLock::new(|| hash_password("shutter-unknown-user").unwrap_or_default());

/// Spend the time of a real verification; always `false`.
pub fn verify_unknown_user(password: &str) -> bool {
  verify_password(password, &DUMMY_HASH);
  false
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Signing configuration for session tokens.
#[derive(Clone)]
pub struct AuthConfig {
  pub jwt_secret:     String,
  pub token_validity: Duration,
  /// Mark session cookies `Secure`; set when served over TLS.
  pub secure_cookie:  bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  Uuid,
  pub name: String,
  pub role: Role,
  pub iat:  i64,
  pub exp:  i64,
}

impl AuthConfig {
  /// Sign a token for `user`, valid for [`AuthConfig::token_validity`].
  pub fn issue(&self, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:  user.id,
      name: user.name.clone(),
      role: user.role,
      iat:  now.timestamp(),
      exp:  (now + self.token_validity).timestamp(),
    };
    encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("jwt encoding error: {e}")))
  }

  /// Check the signature and expiry of `token`.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
      token,
      &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
      &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
      tracing::debug!(error = %e, "rejected token");
      ApiError::BadJwt
    })
  }

  /// `Set-Cookie` value carrying `token`.
  pub fn session_cookie(&self, token: &str) -> String {
    self.cookie(token, self.token_validity.num_seconds())
  }

  /// `Set-Cookie` value that removes the session cookie.
  pub fn expired_cookie(&self) -> String { self.cookie("", 0) }

  fn cookie(&self, value: &str, max_age: i64) -> String {
    let secure = if self.secure_cookie { "; Secure" } else { "" };
    format!("{COOKIE_NAME}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}{secure}")
  }
}

/// The session token of a request, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());
  if let Some(token) = bearer {
    return Some(token.to_owned());
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .find_map(|cookie| {
      let (name, value) = cookie.trim().split_once('=')?;
      (name == COOKIE_NAME && !value.is_empty()).then(|| value.to_owned())
    })
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user: User,
  /// Remote address, when the server was started with connect info.
  pub ip:   Option<IpAddr>,
}

impl CurrentUser {
  pub fn id(&self) -> Uuid { self.user.id }

  pub fn is_admin(&self) -> bool { self.user.is_admin() }

  /// Event source for changes made by this caller.
  pub fn source(&self) -> EventSource {
    EventSource::User { id: self.user.id, ip: self.ip }
  }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: Store + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = token_from_headers(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let claims = state.auth.verify(&token)?;

    let user = state
      .store
      .user_by_id(claims.sub)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::BadJwt)?;

    let ip = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| addr.ip());

    Ok(CurrentUser { user, ip })
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn config() -> AuthConfig {
    AuthConfig {
      jwt_secret:     "test-secret".into(),
      token_validity: Duration::hours(1),
      secure_cookie:  false,
    }
  }

  fn user() -> User {
    User {
      id:            Uuid::new_v4(),
      creation_date: Utc::now(),
      name:          "alice".into(),
      role:          Role::Admin,
      password_hash: String::new(),
    }
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("secret").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("secret", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("secret", "not a phc string"));
  }

  #[test]
  fn issued_token_verifies() {
    let config = config();
    let user = user();
    let claims = config.verify(&config.issue(&user).unwrap()).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.name, "alice");
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.exp - claims.iat, 3600);
  }

  #[test]
  fn token_signed_with_other_secret_is_rejected() {
    let other = AuthConfig { jwt_secret: "other".into(), ..config() };
    let token = other.issue(&user()).unwrap();
    assert!(matches!(config().verify(&token), Err(ApiError::BadJwt)));
  }

  #[test]
  fn expired_token_is_rejected() {
    let expired = AuthConfig { token_validity: Duration::hours(-2), ..config() };
    let token = expired.issue(&user()).unwrap();
    assert!(matches!(config().verify(&token), Err(ApiError::BadJwt)));
  }

  #[test]
  fn cookies_are_secure_when_configured() {
    let plain = config();
    assert!(!plain.session_cookie("t").contains("Secure"));
    assert!(plain.expired_cookie().ends_with("Max-Age=0"));

    let tls = AuthConfig { secure_cookie: true, ..config() };
    assert!(tls.session_cookie("t").starts_with("Authorization=t;"));
    assert!(tls.session_cookie("t").ends_with("; Secure"));
    assert!(tls.expired_cookie().contains("Max-Age=0; Secure"));
  }

  #[test]
  fn unknown_user_check_never_matches() {
    assert!(DUMMY_HASH.starts_with("$argon2"));
    assert!(!verify_unknown_user("shutter-unknown-user"));
    assert!(!verify_unknown_user(""));
  }

  #[test]
  fn bearer_header_wins_over_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; Authorization=from-cookie"));
    assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
  }

  #[test]
  fn no_token_without_header_or_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    headers.insert(header::COOKIE, HeaderValue::from_static("Authorization="));
    assert_eq!(token_from_headers(&headers), None);
  }
}
