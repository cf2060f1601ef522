//! shutter server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and
//! `SHUTTER_*` environment variables, opens the SQLite store and the media
//! directory, creates the root user on first start, and serves the API.
//!
//! # Projection rebuild
//!
//! After changing projection code, replay every event with:
//!
//! ```sh
//! cargo run -p shutter-server -- --rebuild-projections
//! ```

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use shutter_api::{AppState, auth::hash_password};
use shutter_core::store::Store as _;
use shutter_media::MediaStore;
use shutter_server::ServerConfig;
use shutter_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Shutter photo server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Replay every event into fresh projection tables before serving.
  #[arg(long)]
  rebuild_projections: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SHUTTER"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  anyhow::ensure!(!server_cfg.jwt_secret.is_empty(), "jwt_secret must not be empty");

  let store_path = expand_tilde(&server_cfg.store_path);
  let data_dir = expand_tilde(&server_cfg.data_dir);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let media = MediaStore::open(&data_dir)
    .await
    .with_context(|| format!("failed to open media directory {data_dir:?}"))?;

  if cli.rebuild_projections {
    store
      .rebuild_projections()
      .await
      .context("failed to rebuild projections")?;
  }

  let store = Arc::new(store);
  AppState::new(store.clone(), media.clone(), server_cfg.auth_config())
    .users()
    .bootstrap_root(&server_cfg.root_user_name, &server_cfg.root_user_password)
    .await
    .map_err(|e| anyhow::anyhow!("failed to create root user: {e}"))?;

  let app = shutter_server::app(store, media, &server_cfg);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
