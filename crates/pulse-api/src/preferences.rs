//! Handlers for `/preferences/theme`.
//!
//! Saving is best effort: a failed write is logged by the theme context and
//! the new theme still applies for the rest of the session.

use axum::{Json, extract::State};
use pulse_core::theme::{PreferenceStore, Theme};

use crate::AppState;

/// `GET /preferences/theme`
pub async fn get_theme<S, P: PreferenceStore>(State(state): State<AppState<S, P>>) -> Json<Theme> {
  Json(state.theme.theme())
}

/// `PUT /preferences/theme` with body `{"dark_mode":true}`.
pub async fn put_theme<S, P: PreferenceStore>(
  State(state): State<AppState<S, P>>,
  Json(body): Json<Theme>,
) -> Json<Theme> {
  Json(state.theme.set_dark_mode(body.dark_mode).await)
}

/// `POST /preferences/theme/toggle`
pub async fn toggle_theme<S, P: PreferenceStore>(
  State(state): State<AppState<S, P>>,
) -> Json<Theme> {
  Json(state.theme.toggle().await)
}
