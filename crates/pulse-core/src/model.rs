//! Record types read from and written to the remote data source.
//!
//! Every entity is owned by an external system (ETL pipeline, seed script or
//! the backend itself). This crate only reads them, except [`RawInput`], which
//! is written on opinion submission and never read back.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// `state` value marking an aggregate, non-state-specific measurement.
pub const NATIONAL: &str = "National";

// ─── Candidate ───────────────────────────────────────────────────────────────

/// A tracked candidate. Stored as a free string in the data source; parsed
/// case-insensitively wherever a typed value is needed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Candidate {
  #[serde(alias = "Tinubu")]
  Tinubu,
  #[serde(alias = "Obi")]
  Obi,
  #[serde(alias = "Atiku")]
  Atiku,
}

impl Candidate {
  /// The candidates drawn on the approval trend chart.
  pub const CHARTED: [Candidate; 2] = [Candidate::Tinubu, Candidate::Obi];

  pub fn is_charted(self) -> bool { Self::CHARTED.contains(&self) }

  pub fn parse(name: &str) -> Result<Self> {
    Self::from_str(name).map_err(|_| Error::UnknownCandidate(name.to_owned()))
  }
}

// ─── Approval ────────────────────────────────────────────────────────────────

/// One approval measurement for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRating {
  #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
  pub id:           Option<String>,
  pub timestamp:    DateTime<Utc>,
  pub candidate:    String,
  /// 0–100. `None` when the stored value is missing or non-numeric.
  #[serde(default, deserialize_with = "lenient::score")]
  pub rating_score: Option<f64>,
  #[serde(default, deserialize_with = "lenient::number")]
  pub change_delta: f64,
  /// `"National"` or unset for aggregate rows, otherwise a state name.
  #[serde(default)]
  pub state:        Option<String>,
}

impl ApprovalRating {
  /// A national approval row, as written by the seed utility.
  pub fn national(
    timestamp: DateTime<Utc>,
    candidate: Candidate,
    rating_score: f64,
    change_delta: f64,
  ) -> Self {
    Self {
      id: None,
      timestamp,
      candidate: candidate.to_string(),
      rating_score: Some(rating_score),
      change_delta,
      state: Some(NATIONAL.to_owned()),
    }
  }

  /// True for rows that belong on the national time series.
  pub fn is_national(&self) -> bool {
    match self.state.as_deref() {
      None | Some("") => true,
      Some(s) => s == NATIONAL,
    }
  }
}

// ─── Sentiment ───────────────────────────────────────────────────────────────

/// Sentiment split for a candidate at a point in time. The three fractions
/// sum to roughly 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
  #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
  pub id:               Option<String>,
  pub timestamp:        DateTime<Utc>,
  pub candidate:        String,
  #[serde(default, deserialize_with = "lenient::number")]
  pub positive:         f64,
  #[serde(default, deserialize_with = "lenient::number")]
  pub negative:         f64,
  #[serde(default, deserialize_with = "lenient::number")]
  pub neutral:          f64,
  #[serde(default)]
  pub trending_phrases: String,
  #[serde(default)]
  pub headlines:        String,
}

// ─── Demographics ────────────────────────────────────────────────────────────

/// Population and voter figures for one state. Assumed, not enforced:
/// `registered_voters <= voting_age_population <= total_population`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDemographics {
  pub state:                 String,
  #[serde(default, deserialize_with = "lenient::count")]
  pub total_population:      u64,
  #[serde(default, deserialize_with = "lenient::count")]
  pub voting_age_population: u64,
  #[serde(default, deserialize_with = "lenient::count")]
  pub registered_voters:     u64,
  #[serde(default)]
  pub political_affiliation: String,
  #[serde(default)]
  pub tribal_affiliation:    String,
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A free-text opinion submitted by a reader. Consumed by an external ETL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
  pub source:    String,
  pub content:   String,
  /// Client-generated random identifier for the submitter.
  pub user_id:   Uuid,
  /// State name.
  pub location:  String,
  pub candidate: String,
  pub timestamp: DateTime<Utc>,
}

// ─── Lenient number decoding ─────────────────────────────────────────────────

/// Deserialisers that tolerate the loose typing of document-store rows:
/// numbers may arrive as JSON numbers, numeric strings, or not at all.
pub mod lenient {
  use serde::{Deserialize, Deserializer};
  use serde_json::Value;

  fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
      Value::Number(n) => n.as_f64(),
      Value::String(s) => s.trim().parse::<f64>().ok(),
      _ => None,
    };
    parsed.filter(|v| v.is_finite())
  }

  /// Row identifier: text, or a number rendered as text.
  pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
      Value::String(s) => Some(s),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    })
  }

  /// `Some` for numeric values, `None` for anything else.
  pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(as_f64(&Value::deserialize(d)?))
  }

  /// Numeric value, or 0 when missing or non-numeric.
  pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(as_f64(&Value::deserialize(d)?).unwrap_or(0.0))
  }

  /// Non-negative integer count, or 0 when missing or non-numeric.
  pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
      Value::Number(n) => n
        .as_u64()
        .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
        .unwrap_or(0),
      other => as_f64(other).filter(|v| *v >= 0.0).map(|v| v as u64).unwrap_or(0),
    })
  }
}
