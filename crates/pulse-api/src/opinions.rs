//! Handlers for `/opinions`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/opinions/states` | Location picker options; empty while demographics are unavailable |
//! | `POST` | `/opinions` | Body: `{"candidate":"obi","location":"Lagos","content":"..."}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use pulse_core::{
  opinion::{self, OpinionError, OpinionForm},
  source::DataSource,
};

use crate::{AppState, error::ApiError};

/// `GET /opinions/states`
pub async fn states<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Json<Vec<String>> {
  let options = match state.demographics_rows().await {
    Ok(rows) => opinion::state_options(&rows),
    Err(_) => Vec::new(),
  };
  Json(options)
}

/// `POST /opinions`
pub async fn submit<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
  Json(form): Json<OpinionForm>,
) -> Result<impl IntoResponse, ApiError> {
  if let Some(field) = &state.config.missing_configuration {
    return Err(ApiError::MissingConfiguration(field.clone()));
  }
  match opinion::submit(state.hooks.source().as_ref(), &form).await {
    Ok(submission) => Ok((StatusCode::CREATED, Json(submission))),
    Err(OpinionError::Validation(message)) => Err(ApiError::Validation(message)),
    Err(OpinionError::Unavailable) => Err(ApiError::SubmissionFailed),
  }
}
