//! Error type for `pulse-store-remote`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required setting (project id, URL, key) is empty.
  #[error("missing configuration: {0}")]
  MissingConfiguration(&'static str),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid url: {0}")]
  Url(String),

  /// The backend refused the request, e.g. a security rule blocked a write.
  #[error("{backend} rejected the request ({status}): {body}")]
  Rejected {
    backend: &'static str,
    status:  u16,
    body:    String,
  },

  #[error("{backend} returned {status}: {body}")]
  Status {
    backend: &'static str,
    status:  u16,
    body:    String,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("unexpected response shape: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
