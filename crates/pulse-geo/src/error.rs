use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document is not JSON at all.
  #[error("invalid GeoJSON: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("SVG rendering failed: {0}")]
  Render(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
