//! evsync daemon.
//!
//! Reads `evsync.toml` (or the path given with `--config`) plus `EVSYNC_*`
//! environment variables, opens the SQLite store, arms the periodic sync and
//! serves the JSON API.
//!
//! ```text
//! evsyncd --once            # one cycle, report on stdout
//! evsyncd --no-serve        # periodic sync only
//! ```

mod settings;

use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use evsync_client::{ApiClient, Endpoints};
use evsync_store_sqlite::SqliteStore;
use evsync_sync::{Reconciler, Schedule};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::expand_tilde;

#[derive(Parser)]
#[command(author, version, about = "Event sync daemon")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "evsync.toml")]
  config: std::path::PathBuf,

  /// Run a single sync cycle, print its report as JSON and exit.
  #[arg(long)]
  once: bool,

  /// Do not serve the HTTP API; only run the periodic sync.
  #[arg(long)]
  no_serve: bool,
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
  let cfg = settings::load(&cli.config)?;

  if cfg.token.is_none() {
    tracing::warn!("no API token configured; sync cycles will abort");
  }

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(dir) = store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(dir)
      .await
      .with_context(|| format!("failed to create {dir:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let client = ApiClient::new(cfg.api_config()).context("failed to build API client")?;
  let endpoints = Endpoints::new(&cfg.api_base).context("invalid api_base")?;
  let reconciler = Arc::new(Reconciler::new(
    Arc::new(client),
    Arc::new(store),
    endpoints,
    cfg.sync_options(),
  ));

  if cli.once {
    let report = reconciler.run_sync_cycle().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    anyhow::ensure!(report.is_completed(), "sync cycle did not complete");
    return Ok(());
  }

  let schedule = Arc::new(Schedule::new(reconciler, cfg.interval()));
  if cfg.schedule_on_start {
    schedule.enable();
  }

  if cli.no_serve {
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
  } else {
    let app = Router::new()
      .merge(evsync_api::api_router(Arc::clone(&schedule)))
      .layer(TraceLayer::new_for_http());
    let address = cfg.address();

    tracing::info!("Listening on http://{address}");
    let listener = TcpListener::bind(&address)
      .await
      .with_context(|| format!("failed to bind {address}"))?;

    axum::serve(listener, app)
      .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
          tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
      })
      .await
      .context("server error")?;
  }

  schedule.disable();
  tracing::info!("shut down");
  Ok(())
}
