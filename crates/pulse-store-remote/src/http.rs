//! Shared HTTP plumbing.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::warn;

use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn client() -> Result<Client> {
  Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Pass successful responses through; turn everything else into an error
/// carrying the response body.
pub async fn check(backend: &'static str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  warn!(backend, status = status.as_u16(), "request failed");
  let status_code = status.as_u16();
  Err(match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      Error::Rejected { backend, status: status_code, body }
    }
    _ => Error::Status { backend, status: status_code, body },
  })
}
