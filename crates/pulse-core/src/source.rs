//! The `DataSource` trait: the storage port every backend adapter implements.
//!
//! The dashboard reads from one of several interchangeable managed backends
//! (a document store, a relational backend-as-a-service, or a local SQLite
//! file). Higher layers depend on this abstraction, never on an adapter.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::model::{ApprovalRating, RawInput, SentimentBreakdown, StateDemographics};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`DataSource::approval_ratings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalQuery {
  /// Only rows with `timestamp >= since`.
  pub since: Option<DateTime<Utc>>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a PulseTrack data source.
///
/// Reads return rows in the order a chart consumes them; adapters push the
/// ordering (and the `since` filter) down to the backend where they can.
/// National-row filtering is not part of the contract: it is applied by the
/// hooks, because a document store cannot express "equals or unset".
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DataSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Approval rows ordered by timestamp ascending.
  fn approval_ratings(
    &self,
    query: ApprovalQuery,
  ) -> impl Future<Output = Result<Vec<ApprovalRating>, Self::Error>> + Send + '_;

  /// Sentiment rows ordered by timestamp descending (newest first).
  fn sentiment_breakdown(
    &self,
  ) -> impl Future<Output = Result<Vec<SentimentBreakdown>, Self::Error>> + Send + '_;

  /// Demographics rows ordered by `registered_voters` descending.
  fn state_demographics(
    &self,
  ) -> impl Future<Output = Result<Vec<StateDemographics>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Append one submitted opinion to `raw_inputs`.
  fn insert_raw_input(
    &self,
    input: RawInput,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append one approval row. Used by the seed utility.
  fn insert_approval_rating(
    &self,
    row: ApprovalRating,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append one sentiment row. Used by the seed utility.
  fn insert_sentiment(
    &self,
    row: SentimentBreakdown,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace the demographics row keyed by `row.state`.
  fn upsert_demographics(
    &self,
    row: StateDemographics,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
