//! [`AnySource`]: the backend chosen at startup, behind one [`DataSource`].

use pulse_core::{
  model::{ApprovalRating, RawInput, SentimentBreakdown, StateDemographics},
  source::{ApprovalQuery, DataSource},
};
use pulse_store_remote::{FirestoreSource, SupabaseSource};
use pulse_store_sqlite::SqliteSource;
use tracing::info;

use crate::{
  Error, Result,
  config::{BackendConfig, expand_tilde},
};

pub enum AnySource {
  Sqlite(SqliteSource),
  Firestore(FirestoreSource),
  Supabase(SupabaseSource),
  /// The configured backend is missing a required setting; every call
  /// fails with [`Error::MissingConfiguration`].
  Unconfigured(&'static str),
}

impl AnySource {
  pub async fn connect(config: &BackendConfig) -> Result<Self> {
    let source = match config {
      BackendConfig::Sqlite { path } => {
        AnySource::Sqlite(SqliteSource::open(expand_tilde(path)).await?)
      }
      BackendConfig::Firestore(cfg) => AnySource::Firestore(remote(FirestoreSource::new(cfg.clone()))?),
      BackendConfig::Supabase(cfg) => AnySource::Supabase(remote(SupabaseSource::new(cfg.clone()))?),
    };
    info!(backend = source.kind(), "data source ready");
    Ok(source)
  }

  pub fn kind(&self) -> &'static str {
    match self {
      AnySource::Sqlite(_) => "sqlite",
      AnySource::Firestore(_) => "firestore",
      AnySource::Supabase(_) => "supabase",
      AnySource::Unconfigured(_) => "unconfigured",
    }
  }
}

fn remote<T>(result: pulse_store_remote::Result<T>) -> Result<T> {
  result.map_err(|e| match e {
    pulse_store_remote::Error::MissingConfiguration(field) => Error::MissingConfiguration(field),
    other => Error::Remote(other),
  })
}

macro_rules! delegate {
  ($self:ident, $s:ident => $call:expr) => {
    match $self {
      AnySource::Sqlite($s) => Ok($call.await?),
      AnySource::Firestore($s) => Ok($call.await?),
      AnySource::Supabase($s) => Ok($call.await?),
      AnySource::Unconfigured(field) => Err(Error::MissingConfiguration(*field)),
    }
  };
}

impl DataSource for AnySource {
  type Error = Error;

  async fn approval_ratings(&self, query: ApprovalQuery) -> Result<Vec<ApprovalRating>> {
    delegate!(self, s => s.approval_ratings(query))
  }

  async fn sentiment_breakdown(&self) -> Result<Vec<SentimentBreakdown>> {
    delegate!(self, s => s.sentiment_breakdown())
  }

  async fn state_demographics(&self) -> Result<Vec<StateDemographics>> {
    delegate!(self, s => s.state_demographics())
  }

  async fn insert_raw_input(&self, input: RawInput) -> Result<()> {
    delegate!(self, s => s.insert_raw_input(input))
  }

  async fn insert_approval_rating(&self, row: ApprovalRating) -> Result<()> {
    delegate!(self, s => s.insert_approval_rating(row))
  }

  async fn insert_sentiment(&self, row: SentimentBreakdown) -> Result<()> {
    delegate!(self, s => s.insert_sentiment(row))
  }

  async fn upsert_demographics(&self, row: StateDemographics) -> Result<()> {
    delegate!(self, s => s.upsert_demographics(row))
  }
}

#[cfg(test)]
mod tests {
  use pulse_store_remote::SupabaseConfig;

  use super::*;

  #[tokio::test]
  async fn blank_remote_settings_are_missing_configuration() {
    let config = BackendConfig::Supabase(SupabaseConfig { url: String::new(), api_key: "k".into() });
    let err = AnySource::connect(&config).await.err().unwrap();
    assert!(matches!(err, Error::MissingConfiguration("backend.url")));
  }

  #[tokio::test]
  async fn absent_remote_settings_are_missing_configuration() {
    let cfg: crate::ServerConfig = config::Config::builder()
      .add_source(config::File::from_str("[backend]\nkind = \"firestore\"\n", config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    let err = AnySource::connect(&cfg.backend).await.err().unwrap();
    assert!(matches!(err, Error::MissingConfiguration("backend.project_id")));
  }

  #[tokio::test]
  async fn unconfigured_source_fails_every_call() {
    let source = AnySource::Unconfigured("backend.project_id");
    let err = source.state_demographics().await.unwrap_err();
    assert_eq!(err.to_string(), "missing configuration: backend.project_id");
  }

  #[tokio::test]
  async fn sqlite_backend_delegates() {
    let path = std::env::temp_dir().join(format!("pulse-{}.db", uuid::Uuid::new_v4()));
    let source = AnySource::connect(&BackendConfig::Sqlite { path: path.clone() }).await.unwrap();
    assert_eq!(source.kind(), "sqlite");
    source
      .upsert_demographics(StateDemographics {
        state:                 "Abuja".into(),
        total_population:      3_500_000,
        voting_age_population: 2_400_000,
        registered_voters:     1_800_000,
        political_affiliation: "Mixed".into(),
        tribal_affiliation:    "Mixed".into(),
      })
      .await
      .unwrap();
    assert_eq!(source.state_demographics().await.unwrap().len(), 1);
    drop(source);
    std::fs::remove_file(path).ok();
  }
}
