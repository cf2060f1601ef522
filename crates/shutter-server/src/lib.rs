//! HTTP server assembly for Shutter.
//!
//! Mounts the JSON API under `/api/v1`, optionally serves a directory of
//! static assets for everything else, and traces every request.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use chrono::Duration;
use serde::Deserialize;
use shutter_api::{AppState, AuthConfig, api_router};
use shutter_core::store::Store;
use shutter_media::MediaStore;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SHUTTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  /// SQLite database file.
  pub store_path:         PathBuf,
  /// Root of the raw and compressed photo files.
  pub data_dir:           PathBuf,
  /// Built frontend to serve next to the API, if any.
  #[serde(default)]
  pub static_dir:         Option<PathBuf>,
  pub jwt_secret:         String,
  #[serde(default = "default_jwt_validity_secs")]
  pub jwt_validity_secs:  i64,
  /// Add `Secure` to session cookies; enable behind TLS.
  #[serde(default)]
  pub secure_cookies:     bool,
  /// Administrator created when the store has no user yet.
  #[serde(default = "default_root_user_name")]
  pub root_user_name:     String,
  pub root_user_password: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_jwt_validity_secs() -> i64 { 24 * 60 * 60 }

fn default_root_user_name() -> String { "admin".to_string() }

impl ServerConfig {
  pub fn auth_config(&self) -> AuthConfig {
    AuthConfig {
      jwt_secret:     self.jwt_secret.clone(),
      token_validity: Duration::seconds(self.jwt_validity_secs),
      secure_cookie:  self.secure_cookies,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
pub fn app<S>(
  store: Arc<S>,
  media: MediaStore,
  config: &ServerConfig,
) -> Router
where
  S: Store + 'static,
{
  let state = AppState::new(store, media, config.auth_config());
  let router = Router::new().nest(API_PREFIX, api_router(state));

  let router = match &config.static_dir {
    Some(dir) => router.fallback_service(ServeDir::new(dir)),
    None => router,
  };
  router.layer(TraceLayer::new_for_http())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use shutter_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const CONFIG: &str = r#"
    store_path = "/tmp/shutter.db"
    data_dir = "/tmp/shutter"
    jwt_secret = "secret"
    root_user_password = "root-password"
  "#;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  async fn make_app(
    static_dir: Option<PathBuf>,
  ) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = parse(CONFIG);
    config.static_dir = static_dir;

    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let media = MediaStore::open(dir.path().join("media")).await.unwrap();
    AppState::new(store.clone(), media.clone(), config.auth_config())
      .users()
      .bootstrap_root(&config.root_user_name, &config.root_user_password)
      .await
      .unwrap();

    (app(store, media, &config), dir)
  }

  #[test]
  fn config_defaults_apply() {
    let config = parse(CONFIG);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.jwt_validity_secs, 86_400);
    assert_eq!(config.root_user_name, "admin");
    assert!(config.static_dir.is_none());
    assert!(!config.auth_config().secure_cookie);
    assert_eq!(config.auth_config().token_validity, Duration::days(1));
  }

  #[test]
  fn config_overrides_defaults() {
    let config = parse(&format!(
      "{CONFIG}\nport = 9000\njwt_validity_secs = 60\nstatic_dir = \"/srv/www\"\nsecure_cookies = true"
    ));
    assert!(config.auth_config().secure_cookie);
    assert_eq!(config.port, 9000);
    assert_eq!(config.auth_config().token_validity, Duration::minutes(1));
    assert_eq!(config.static_dir, Some(PathBuf::from("/srv/www")));
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let (app, _dir) = make_app(None).await;
    let req = Request::builder()
      .method("POST")
      .uri("/api/v1/login")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(r#"{"name":"admin","password":"root-password"}"#))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/login").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn static_dir_serves_assets() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), "<h1>shutter</h1>").unwrap();
    let (app, _dir) = make_app(Some(assets.path().to_path_buf())).await;

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"<h1>shutter</h1>");

    // API errors still come back as JSON.
    let req = Request::builder().uri("/api/v1/users/me").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "unauthorized");
  }
}
