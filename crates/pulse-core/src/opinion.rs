//! Opinion submission: the one write path of the dashboard.
//!
//! Writes go straight to the data source and bypass the hooks. There is no
//! idempotency: resubmitting after a failure may create a duplicate record.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  model::{Candidate, RawInput, StateDemographics},
  source::DataSource,
};

/// Maximum opinion length accepted by the form.
pub const MAX_OPINION_CHARS: usize = 500;

/// `source` value recorded for form submissions.
pub const USER_FORM_SOURCE: &str = "user_form";

pub const MISSING_FIELDS_MESSAGE: &str = "Please select a state and enter your opinion.";
pub const TOO_LONG_MESSAGE: &str = "Please keep your opinion under 500 characters.";
pub const THANK_YOU_MESSAGE: &str = "Thank you! Your opinion has been recorded.";
pub const RETRY_MESSAGE: &str = "Unexpected error. Please try again.";

#[derive(Debug, Error)]
pub enum OpinionError {
  /// The form is incomplete; nothing was written.
  #[error("{0}")]
  Validation(&'static str),

  /// The write failed for any reason. The cause is logged, not shown.
  #[error("Unexpected error. Please try again.")]
  Unavailable,
}

/// The submitted form.
#[derive(Debug, Clone, Deserialize)]
pub struct OpinionForm {
  #[serde(default = "default_candidate")]
  pub candidate: Candidate,
  #[serde(default)]
  pub location:  String,
  #[serde(default, alias = "opinion")]
  pub content:   String,
}

fn default_candidate() -> Candidate { Candidate::Tinubu }

impl OpinionForm {
  /// Check the form and return the trimmed opinion text.
  pub fn validate(&self) -> Result<&str, OpinionError> {
    let content = self.content.trim();
    if content.is_empty() || self.location.trim().is_empty() {
      return Err(OpinionError::Validation(MISSING_FIELDS_MESSAGE));
    }
    if content.chars().count() > MAX_OPINION_CHARS {
      return Err(OpinionError::Validation(TOO_LONG_MESSAGE));
    }
    Ok(content)
  }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
  pub message: &'static str,
  pub user_id: Uuid,
}

/// Validate `form` and write one `raw_inputs` record.
pub async fn submit<S: DataSource>(
  source: &S,
  form: &OpinionForm,
) -> Result<Submission, OpinionError> {
  let content = form.validate()?;

  let input = RawInput {
    source:    USER_FORM_SOURCE.to_owned(),
    content:   content.to_owned(),
    user_id:   Uuid::new_v4(),
    location:  form.location.trim().to_owned(),
    candidate: form.candidate.to_string(),
    timestamp: Utc::now(),
  };
  let user_id = input.user_id;

  match source.insert_raw_input(input).await {
    Ok(()) => {
      info!(%user_id, candidate = %form.candidate, "opinion recorded");
      Ok(Submission { message: THANK_YOU_MESSAGE, user_id })
    }
    Err(e) => {
      warn!(error = %e, "opinion write failed");
      Err(OpinionError::Unavailable)
    }
  }
}

/// State names offered by the form's location picker: sorted, deduplicated.
pub fn state_options(rows: &[StateDemographics]) -> Vec<String> {
  rows
    .iter()
    .map(|r| r.state.trim())
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}
