//! PulseTrack dashboard server.
//!
//! Reads `pulse.toml` (or the path given with `--config`), connects the
//! configured data source, and serves the dashboard API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use pulse_api::{ApiConfig, AppState, Snapstats};
use pulse_core::{hooks::Hooks, theme::ThemeContext};
use pulse_server::{AnySource, Error, ServerConfig, config::expand_tilde};
use pulse_store_sqlite::SqliteSource;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "PulseTrack dashboard server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "pulse.toml")]
  config: PathBuf,
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
  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let (source, missing_configuration) = match AnySource::connect(&cfg.backend).await {
    Ok(source) => (source, None),
    Err(Error::MissingConfiguration(field)) => {
      tracing::warn!(field, "backend is not configured; data endpoints will report it");
      (AnySource::Unconfigured(field), Some(field.to_owned()))
    }
    Err(e) => return Err(e).context("failed to connect data source"),
  };

  // Theme preferences share the SQLite file when there is one.
  let preferences = match &source {
    AnySource::Sqlite(sqlite) => sqlite.clone(),
    _ => {
      let path = expand_tilde(&cfg.preferences_path);
      SqliteSource::open(&path)
        .await
        .with_context(|| format!("failed to open preferences at {path:?}"))?
    }
  };

  let hooks = Arc::new(Hooks::new(Arc::new(source), cfg.queries.hook_options()));
  let _polls = if missing_configuration.is_none() { hooks.start_polling() } else { Vec::new() };

  let snapstats = Snapstats::new(cfg.snapstats.clone(), cfg.queries.static_options())
    .context("failed to set up snapstats")?;
  let _snapstats_poll = snapstats.start_polling();

  let state = AppState {
    hooks,
    theme: Arc::new(ThemeContext::load(preferences).await),
    snapstats: Arc::new(snapstats),
    config: Arc::new(ApiConfig { dev_mode: cfg.dev_mode, missing_configuration }),
  };

  let app = pulse_api::router(state);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
