//! Data access hooks: one cached query per dashboard data set.
//!
//! | Hook | Key | Rows | Options |
//! |------|-----|------|---------|
//! | [`Hooks::approval`] | `approval/30d` | national, last 30 days, oldest first | volatile |
//! | [`Hooks::trends`] | `trends/all` | national, all time, oldest first | volatile |
//! | [`Hooks::sentiment`] | `sentiment/latest` | all, newest first | volatile |
//! | [`Hooks::demographics`] | `demographics/all` | all, most registered voters first | slow |

use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
  model::{ApprovalRating, SentimentBreakdown, StateDemographics},
  query::{CachedQuery, PollHandle, QueryOptions, QueryState},
  source::{ApprovalQuery, DataSource},
};

/// Window of the current-approval query.
pub const APPROVAL_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache settings for the two classes of data.
#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
  /// Approval, trends and sentiment.
  pub volatile: QueryOptions,
  /// Demographics.
  pub slow:     QueryOptions,
}

impl HookOptions {
  pub fn standard() -> Self {
    Self { volatile: QueryOptions::volatile(), slow: QueryOptions::slow() }
  }
}

/// The cached queries every section reads through.
pub struct Hooks<S> {
  source:       Arc<S>,
  approval:     Arc<CachedQuery<Vec<ApprovalRating>>>,
  trends:       Arc<CachedQuery<Vec<ApprovalRating>>>,
  sentiment:    Arc<CachedQuery<Vec<SentimentBreakdown>>>,
  demographics: Arc<CachedQuery<Vec<StateDemographics>>>,
}

// ─── Fetchers ────────────────────────────────────────────────────────────────

async fn national_approval<S: DataSource>(
  source: Arc<S>,
  window: Option<Duration>,
) -> Result<Vec<ApprovalRating>, S::Error> {
  let since = window
    .and_then(|w| chrono::Duration::from_std(w).ok())
    .map(|w| Utc::now() - w);
  let mut rows = source.approval_ratings(ApprovalQuery { since }).await?;
  rows.retain(ApprovalRating::is_national);
  Ok(rows)
}

async fn sentiment_rows<S: DataSource>(
  source: Arc<S>,
) -> Result<Vec<SentimentBreakdown>, S::Error> {
  source.sentiment_breakdown().await
}

async fn demographics_rows<S: DataSource>(
  source: Arc<S>,
) -> Result<Vec<StateDemographics>, S::Error> {
  source.state_demographics().await
}

// ─── Hooks ───────────────────────────────────────────────────────────────────

impl<S: DataSource + 'static> Hooks<S> {
  pub fn new(source: Arc<S>, options: HookOptions) -> Self {
    Self {
      source,
      approval: Arc::new(CachedQuery::new("approval/30d", options.volatile)),
      trends: Arc::new(CachedQuery::new("trends/all", options.volatile)),
      sentiment: Arc::new(CachedQuery::new("sentiment/latest", options.volatile)),
      demographics: Arc::new(CachedQuery::new("demographics/all", options.slow)),
    }
  }

  /// The underlying data source, for the write path.
  pub fn source(&self) -> &Arc<S> { &self.source }

  pub async fn approval(&self) -> QueryState<Vec<ApprovalRating>> {
    let source = Arc::clone(&self.source);
    self
      .approval
      .get(move || national_approval(Arc::clone(&source), Some(APPROVAL_WINDOW)))
      .await
  }

  pub async fn trends(&self) -> QueryState<Vec<ApprovalRating>> {
    let source = Arc::clone(&self.source);
    self
      .trends
      .get(move || national_approval(Arc::clone(&source), None))
      .await
  }

  pub async fn sentiment(&self) -> QueryState<Vec<SentimentBreakdown>> {
    let source = Arc::clone(&self.source);
    self.sentiment.get(move || sentiment_rows(Arc::clone(&source))).await
  }

  pub async fn demographics(&self) -> QueryState<Vec<StateDemographics>> {
    let source = Arc::clone(&self.source);
    self
      .demographics
      .get(move || demographics_rows(Arc::clone(&source)))
      .await
  }

  /// Start background refetching for every hook. Polling stops when the
  /// returned handles are dropped.
  pub fn start_polling(&self) -> Vec<PollHandle> {
    let approval = Arc::clone(&self.source);
    let trends = Arc::clone(&self.source);
    let sentiment = Arc::clone(&self.source);
    let demographics = Arc::clone(&self.source);
    vec![
      self.approval.spawn_polling(move || {
        national_approval(Arc::clone(&approval), Some(APPROVAL_WINDOW))
      }),
      self
        .trends
        .spawn_polling(move || national_approval(Arc::clone(&trends), None)),
      self
        .sentiment
        .spawn_polling(move || sentiment_rows(Arc::clone(&sentiment))),
      self
        .demographics
        .spawn_polling(move || demographics_rows(Arc::clone(&demographics))),
    ]
  }
}
