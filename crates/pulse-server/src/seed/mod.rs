//! Seed utility: populate a data source with synthetic (`test`) or archived
//! (`production`) data.
//!
//! Production seeding writes approval and sentiment rows only. Raw inputs
//! are never seeded: they would be picked up by the external ETL.

pub mod archive;
pub mod fixtures;

use std::{path::Path, str::FromStr};

use chrono::{DateTime, Utc};

use pulse_core::{
  model::{ApprovalRating, SentimentBreakdown, StateDemographics},
  source::DataSource,
};
use rand::Rng;
use strum::VariantNames as _;
use thiserror::Error;
use tracing::info;

pub use archive::{ARCHIVE_FILES, archive_dataset};
pub use fixtures::test_dataset;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
  /// Synthetic rows for development.
  Test,
  /// Rows read from the CSV archive.
  #[default]
  Production,
}

impl Mode {
  /// `None` means the default mode.
  pub fn parse(arg: Option<&str>) -> Result<Self, SeedError> {
    match arg {
      None => Ok(Mode::default()),
      Some(s) => Mode::from_str(s).map_err(|_| SeedError::UnknownMode(s.to_owned())),
    }
  }
}

#[derive(Debug, Error)]
pub enum SeedError {
  #[error("invalid mode {0:?}; use one of: {modes}", modes = Mode::VARIANTS.join(", "))]
  UnknownMode(String),

  #[error(
    "CSV files not found in {dir}; expected: {expected}",
    expected = ARCHIVE_FILES.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(", ")
  )]
  MissingFiles { dir: String, missing: Vec<String> },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed archive CSV: {0}")]
  Csv(#[from] csv::Error),
}

/// Everything one seeding run writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
  pub demographics: Vec<StateDemographics>,
  pub approval:     Vec<ApprovalRating>,
  pub sentiment:    Vec<SentimentBreakdown>,
}

/// Counts of rows written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub demographics: usize,
  pub approval:     usize,
  pub sentiment:    usize,
}

/// The rows `mode` writes: synthetic for `test`, read from `data_dir` for
/// `production`. Needs no data source.
pub fn load_dataset<R: Rng>(
  mode: Mode,
  data_dir: &Path,
  rng: &mut R,
  now: DateTime<Utc>,
) -> Result<Dataset, SeedError> {
  match mode {
    Mode::Test => Ok(test_dataset(rng, now)),
    Mode::Production => archive_dataset(data_dir),
  }
}

/// Write `dataset` to `source`: demographics first, then approval, then
/// sentiment. Stops at the first failed write.
pub async fn write_dataset<S: DataSource>(
  source: &S,
  dataset: Dataset,
) -> Result<SeedReport, S::Error> {
  let mut report = SeedReport::default();

  for row in dataset.demographics {
    let state = row.state.clone();
    source.upsert_demographics(row).await?;
    info!(%state, "added demographics");
    report.demographics += 1;
  }

  for row in dataset.approval {
    source.insert_approval_rating(row).await?;
    report.approval += 1;
  }
  info!(count = report.approval, "added approval ratings");

  for row in dataset.sentiment {
    let candidate = row.candidate.clone();
    source.insert_sentiment(row).await?;
    info!(%candidate, "added sentiment breakdown");
    report.sentiment += 1;
  }

  Ok(report)
}
