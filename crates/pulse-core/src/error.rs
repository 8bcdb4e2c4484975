//! Error types for `pulse-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("data source unavailable: {0}")]
  Unavailable(String),

  #[error("write rejected: {0}")]
  WriteRejected(String),

  #[error("unknown candidate: {0:?}")]
  UnknownCandidate(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
