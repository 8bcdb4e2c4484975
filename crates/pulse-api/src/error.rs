//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure becomes a JSON body `{"error": <code>, "message": <text>}`.
//! The message is always reader-facing; causes are logged, never returned.

use std::any::Any;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pulse_core::opinion::RETRY_MESSAGE;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Actions offered on the generic error page.
pub const RECOVERY_ACTIONS: [&str; 2] = ["reload", "back"];

pub const SERVER_ERROR_MESSAGE: &str =
  "We hit a snag processing your request. Please try again shortly.";
pub const NOT_FOUND_MESSAGE: &str = "We couldn’t find that page.";

// ─── Sections ────────────────────────────────────────────────────────────────

/// A dashboard section whose data failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Section {
  Approval,
  Trends,
  Sentiment,
  Demographics,
  Map,
}

impl Section {
  /// Inline notice shown in place of the section.
  pub fn notice(self) -> &'static str {
    match self {
      Section::Approval => "We couldn’t load approval ratings right now. Please refresh.",
      Section::Trends => "We couldn’t load approval trends right now. Please refresh.",
      Section::Sentiment => "We couldn’t load sentiment data right now. Please refresh.",
      Section::Demographics => {
        "We couldn’t load demographics right now. Please try again later."
      }
      Section::Map => {
        "We couldn’t load the map data. Please check your connection and try again."
      }
    }
  }
}

// ─── ApiError ────────────────────────────────────────────────────────────────

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A section's query failed after retries and nothing is cached.
  #[error("{section} unavailable")]
  Section { section: Section },

  #[error("missing configuration: {0}")]
  MissingConfiguration(String),

  /// The opinion form is incomplete; the message is shown inline.
  #[error("{0}")]
  Validation(&'static str),

  /// The opinion write failed. The cause has already been logged.
  #[error("submission failed")]
  SubmissionFailed,

  #[error("not found")]
  NotFound,
}

impl ApiError {
  pub fn section(section: Section) -> Self { ApiError::Section { section } }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Section { section } => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "unavailable", "section": section, "message": section.notice() }),
      ),
      ApiError::MissingConfiguration(field) => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({
          "error": "missing_configuration",
          "message": format!("This dashboard is missing configuration: {field}."),
        }),
      ),
      ApiError::Validation(message) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "validation", "message": message }),
      ),
      ApiError::SubmissionFailed => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "unavailable", "message": RETRY_MESSAGE }),
      ),
      ApiError::NotFound => (
        StatusCode::NOT_FOUND,
        json!({ "error": "not_found", "message": NOT_FOUND_MESSAGE, "actions": RECOVERY_ACTIONS }),
      ),
    };
    (status, Json(body)).into_response()
  }
}

// ─── Panics ──────────────────────────────────────────────────────────────────

/// Response for a handler that panicked. The panic message is included
/// only in development mode.
pub fn panic_response(err: Box<dyn Any + Send + 'static>, dev_mode: bool) -> Response {
  let detail = if let Some(s) = err.downcast_ref::<String>() {
    s.clone()
  } else if let Some(s) = err.downcast_ref::<&str>() {
    (*s).to_owned()
  } else {
    "unknown panic".to_owned()
  };
  error!(%detail, "handler panicked");

  let mut body = json!({
    "error": "server_error",
    "message": SERVER_ERROR_MESSAGE,
    "actions": RECOVERY_ACTIONS,
  });
  if dev_mode {
    body["detail"] = json!(detail);
  }
  (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
