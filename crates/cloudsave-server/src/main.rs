//! cloudsave server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, starts the expiry sweeper, and serves both endpoints over
//! HTTP.
//!
//! # Managing subscription codes
//!
//! Codes are provisioned out of band:
//!
//! ```
//! cargo run -p cloudsave-server --bin server -- --grant VIP2024:GOLD
//! cargo run -p cloudsave-server --bin server -- --revoke VIP2024
//! ```

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use cloudsave_core::{identity::IdentityHasher, subscription::Tier};
use cloudsave_server::{AppState, ServerConfig, admin, sweep};
use cloudsave_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cloudsave code store and subscription verifier")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create or reactivate a subscription code (`CODE:TIER`) and exit.
  #[arg(long, value_name = "CODE:TIER", value_parser = parse_grant)]
  grant: Vec<(String, Tier)>,

  /// Deactivate a subscription code and exit.
  #[arg(long, value_name = "CODE")]
  revoke: Vec<String>,
}

fn parse_grant(s: &str) -> Result<(String, Tier), String> {
  let (code, tier) = s.split_once(':').ok_or("expected CODE:TIER")?;
  if code.trim().is_empty() {
    return Err("code must not be empty".into());
  }
  let tier = tier.parse::<Tier>().map_err(|e| e.to_string())?;
  Ok((code.to_string(), tier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CLOUDSAVE").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper modes: edit subscription codes and exit.
  if !cli.grant.is_empty() || !cli.revoke.is_empty() {
    admin::apply(&store, &cli.grant, &cli.revoke, &mut std::io::stdout()).await?;
    return Ok(());
  }

  let hasher = IdentityHasher::new(&server_cfg.identity_secret)
    .context("identity_secret must be set")?;

  let store = Arc::new(store);
  let sweeper = sweep::spawn(
    store.clone(),
    server_cfg.limits.clone(),
    Duration::from_secs(server_cfg.sweep_interval_secs.max(1)),
  );

  // Build application state.
  let state = AppState {
    store,
    config: Arc::new(server_cfg.clone()),
    hasher: Arc::new(hasher),
  };

  let app = cloudsave_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await;

  sweeper.abort();
  served.context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl-C, shutting down");
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
        tracing::info!("received SIGTERM, shutting down");
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
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
