//! Error type for `pulse-server`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("sqlite backend: {0}")]
  Sqlite(#[from] pulse_store_sqlite::Error),

  #[error("remote backend: {0}")]
  Remote(#[from] pulse_store_remote::Error),

  /// A required backend setting is empty. The server still starts and
  /// reports it on every data endpoint.
  #[error("missing configuration: {0}")]
  MissingConfiguration(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
