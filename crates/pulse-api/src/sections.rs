//! Handlers for the dashboard sections.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/approval` | National rows of the last 30 days, oldest first |
//! | `GET` | `/approval/current` | Latest row per candidate |
//! | `GET` | `/trends` | Monthly averages for the charted candidates |
//! | `GET` | `/sentiment` | All rows, newest first |
//! | `GET` | `/sentiment/latest` | Latest row per candidate |
//! | `GET` | `/headlines` | Latest headlines per candidate |
//! | `GET` | `/demographics` | Most registered voters first |
//! | `GET` | `/demographics/summary` | Nationwide totals |
//! | `GET` | `/demographics/chart` | Registered-voter bars |
//! | `GET` | `/demographics/states` | `?names=Lagos,Kano` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  response::{IntoResponse, Response},
};
use pulse_core::{
  aggregate::{
    self, DemographicsSummary, Headline, MonthlyBucket, StateDetail, VoterBar,
  },
  model::{ApprovalRating, SentimentBreakdown, StateDemographics},
  query::QueryState,
  source::DataSource,
};
use serde::Deserialize;

use crate::{
  AppState,
  error::{ApiError, Section},
};

/// The section's rows, or its notice when nothing could be loaded.
/// Stale rows are served as-is.
fn loaded<T>(state: QueryState<T>, section: Section) -> Result<Arc<T>, ApiError> {
  state.data.ok_or(ApiError::section(section))
}

impl<S: DataSource + 'static, P> AppState<S, P> {
  fn configured(&self) -> Result<(), ApiError> {
    match &self.config.missing_configuration {
      Some(field) => Err(ApiError::MissingConfiguration(field.clone())),
      None => Ok(()),
    }
  }

  async fn approval_rows(&self) -> Result<Arc<Vec<ApprovalRating>>, ApiError> {
    self.configured()?;
    loaded(self.hooks.approval().await, Section::Approval)
  }

  async fn trend_rows(&self) -> Result<Arc<Vec<ApprovalRating>>, ApiError> {
    self.configured()?;
    loaded(self.hooks.trends().await, Section::Trends)
  }

  async fn sentiment_rows(&self) -> Result<Arc<Vec<SentimentBreakdown>>, ApiError> {
    self.configured()?;
    loaded(self.hooks.sentiment().await, Section::Sentiment)
  }

  pub(crate) async fn demographics_rows(&self) -> Result<Arc<Vec<StateDemographics>>, ApiError> {
    self.configured()?;
    loaded(self.hooks.demographics().await, Section::Demographics)
  }
}

// ─── Approval ────────────────────────────────────────────────────────────────

/// `GET /approval`
pub async fn approval<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Response, ApiError> {
  let rows = state.approval_rows().await?;
  Ok(Json(rows.as_slice()).into_response())
}

/// `GET /approval/current`
pub async fn current_approval<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<ApprovalRating>>, ApiError> {
  let rows = state.approval_rows().await?;
  Ok(Json(aggregate::latest_by_candidate(&rows)))
}

/// `GET /trends`
pub async fn trends<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<MonthlyBucket>>, ApiError> {
  let rows = state.trend_rows().await?;
  Ok(Json(aggregate::monthly_trends(&rows)))
}

// ─── Sentiment ───────────────────────────────────────────────────────────────

/// `GET /sentiment`
pub async fn sentiment<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Response, ApiError> {
  let rows = state.sentiment_rows().await?;
  Ok(Json(rows.as_slice()).into_response())
}

/// `GET /sentiment/latest`
pub async fn latest_sentiment<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<SentimentBreakdown>>, ApiError> {
  let rows = state.sentiment_rows().await?;
  Ok(Json(aggregate::latest_sentiment_by_candidate(&rows)))
}

/// `GET /headlines`
pub async fn headlines<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<Headline>>, ApiError> {
  let rows = state.sentiment_rows().await?;
  Ok(Json(aggregate::headlines(&rows)))
}

// ─── Demographics ────────────────────────────────────────────────────────────

/// `GET /demographics`
pub async fn demographics<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Response, ApiError> {
  let rows = state.demographics_rows().await?;
  Ok(Json(rows.as_slice()).into_response())
}

/// `GET /demographics/summary`
pub async fn demographics_summary<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<DemographicsSummary>, ApiError> {
  let rows = state.demographics_rows().await?;
  Ok(Json(DemographicsSummary::from_rows(&rows)))
}

/// `GET /demographics/chart`
pub async fn demographics_chart<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<VoterBar>>, ApiError> {
  let rows = state.demographics_rows().await?;
  Ok(Json(aggregate::voter_bars(&rows)))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatesParams {
  /// Comma-separated state names.
  #[serde(default)]
  pub names: String,
}

/// `GET /demographics/states?names=<a,b,...>`
pub async fn state_details<S: DataSource + 'static, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<StatesParams>,
) -> Result<Json<Vec<StateDetail>>, ApiError> {
  let rows = state.demographics_rows().await?;
  let names: Vec<String> = params
    .names
    .split(',')
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(str::to_owned)
    .collect();
  Ok(Json(aggregate::state_details(&rows, &names)))
}
