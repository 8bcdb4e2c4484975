//! Populate the configured data source.
//!
//! ```
//! cargo run -p pulse-server --bin seed -- test
//! cargo run -p pulse-server --bin seed -- production --data-dir data/archive
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use pulse_server::{
  AnySource, ServerConfig,
  seed::{self, Mode},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Seed PulseTrack with test or archived data")]
struct Cli {
  /// `test` or `production` (the default).
  mode: Option<String>,

  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "pulse.toml")]
  config: PathBuf,

  /// Directory holding the candidate CSV archive.
  #[arg(long, default_value = "data/archive")]
  data_dir: PathBuf,
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
  let mode = Mode::parse(cli.mode.as_deref())?;
  // Read the archive before touching the backend.
  let dataset = seed::load_dataset(mode, &cli.data_dir, &mut rand::thread_rng(), Utc::now())?;

  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;
  let source = AnySource::connect(&cfg.backend)
    .await
    .context("failed to connect data source")?;
  tracing::info!(%mode, backend = source.kind(), "seeding");

  let report = seed::write_dataset(&source, dataset)
    .await
    .context("failed to write seed data")?;
  tracing::info!(
    demographics = report.demographics,
    approval = report.approval,
    sentiment = report.sentiment,
    "seeding complete"
  );

  Ok(())
}
