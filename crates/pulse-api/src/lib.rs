//! JSON/SVG HTTP API for the PulseTrack dashboard.
//!
//! Exposes an axum [`Router`] backed by any [`DataSource`] (through the
//! cached [`Hooks`]) and any [`PreferenceStore`] (through the
//! [`ThemeContext`]). Each dashboard section is its own endpoint and fails
//! on its own: one unavailable section never takes down another.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = pulse_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod opinions;
pub mod preferences;
pub mod sections;
pub mod snapstats;

use std::{any::Any, sync::Arc};

use axum::{
  Json, Router,
  routing::{get, post},
};
use pulse_core::{
  hooks::Hooks,
  source::DataSource,
  theme::{PreferenceStore, ThemeContext},
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use error::{ApiError, Section};
pub use snapstats::{Snapstats, SnapstatsConfig};

// ─── Application state ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
  /// Include panic messages in error responses.
  pub dev_mode:              bool,
  /// Set when the data source could not be configured; every data endpoint
  /// then answers with a `missing_configuration` notice.
  pub missing_configuration: Option<String>,
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S, P> {
  pub hooks:     Arc<Hooks<S>>,
  pub theme:     Arc<ThemeContext<P>>,
  pub snapstats: Arc<Snapstats>,
  pub config:    Arc<ApiConfig>,
}

impl<S, P> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self {
      hooks:     Arc::clone(&self.hooks),
      theme:     Arc::clone(&self.theme),
      snapstats: Arc::clone(&self.snapstats),
      config:    Arc::clone(&self.config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the dashboard router for `state`.
pub fn router<S, P>(state: AppState<S, P>) -> Router
where
  S: DataSource + 'static,
  P: PreferenceStore + 'static,
{
  let dev_mode = state.config.dev_mode;
  let routes = Router::new()
    .route("/healthz", get(healthz))
    // Approval
    .route("/approval", get(sections::approval::<S, P>))
    .route("/approval/current", get(sections::current_approval::<S, P>))
    .route("/trends", get(sections::trends::<S, P>))
    // Sentiment
    .route("/sentiment", get(sections::sentiment::<S, P>))
    .route("/sentiment/latest", get(sections::latest_sentiment::<S, P>))
    .route("/headlines", get(sections::headlines::<S, P>))
    // Demographics
    .route("/demographics", get(sections::demographics::<S, P>))
    .route("/demographics/summary", get(sections::demographics_summary::<S, P>))
    .route("/demographics/chart", get(sections::demographics_chart::<S, P>))
    .route("/demographics/states", get(sections::state_details::<S, P>))
    // Opinions
    .route("/opinions", post(opinions::submit::<S, P>))
    .route("/opinions/states", get(opinions::states::<S, P>))
    // Snapstats
    .route("/snapstats/features", get(snapstats::features::<S, P>))
    .route("/snapstats/zones", get(snapstats::zones::<S, P>))
    .route("/snapstats/parties", get(snapstats::parties::<S, P>))
    .route("/snapstats/tribes", get(snapstats::tribes::<S, P>))
    .route("/snapstats/map.svg", get(snapstats::map_svg::<S, P>))
    .route("/snapstats/view", get(snapstats::view::<S, P>))
    // Preferences
    .route(
      "/preferences/theme",
      get(preferences::get_theme::<S, P>).put(preferences::put_theme::<S, P>),
    )
    .route("/preferences/theme/toggle", post(preferences::toggle_theme::<S, P>))
    .fallback(not_found)
    .with_state(state);

  catch_panics(routes, dev_mode).layer(TraceLayer::new_for_http())
}

fn catch_panics(router: Router, dev_mode: bool) -> Router {
  router.layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
    error::panic_response(err, dev_mode)
  }))
}

/// `GET /healthz`
async fn healthz() -> Json<Value> { Json(json!({ "ok": true })) }

async fn not_found() -> ApiError { ApiError::NotFound }

#[cfg(test)]
mod tests;
