//! Encoding and decoding helpers between the record types and the values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! comparison orders them chronologically. UUIDs are stored hyphenated.

use chrono::{DateTime, SecondsFormat, Utc};
use pulse_core::model::{ApprovalRating, SentimentBreakdown, StateDemographics};
use rusqlite::types::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Loose numbers ───────────────────────────────────────────────────────────

/// A finite number, from a numeric or numeric-text column.
pub fn decode_score(v: &Value) -> Option<f64> {
  let n = match v {
    Value::Real(f) => Some(*f),
    Value::Integer(i) => Some(*i as f64),
    Value::Text(s) => s.trim().parse().ok(),
    Value::Null | Value::Blob(_) => None,
  };
  n.filter(|n| n.is_finite())
}

pub fn decode_number(v: &Value) -> f64 { decode_score(v).unwrap_or(0.0) }

pub fn decode_count(v: &Value) -> u64 {
  match v {
    Value::Integer(i) => u64::try_from(*i).unwrap_or(0),
    other => decode_score(other).filter(|n| *n >= 0.0).map_or(0, |n| n as u64),
  }
}

pub fn encode_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `approval_ratings` row.
pub struct RawApproval {
  pub id:           i64,
  pub timestamp:    String,
  pub candidate:    String,
  pub rating_score: Value,
  pub change_delta: Value,
  pub state:        Option<String>,
}

impl RawApproval {
  pub fn into_rating(self) -> Result<ApprovalRating> {
    Ok(ApprovalRating {
      id:           Some(self.id.to_string()),
      timestamp:    decode_dt(&self.timestamp)?,
      candidate:    self.candidate,
      rating_score: decode_score(&self.rating_score),
      change_delta: decode_number(&self.change_delta),
      state:        self.state,
    })
  }
}

/// Raw values read directly from a `sentiment_breakdown` row.
pub struct RawSentiment {
  pub id:               i64,
  pub timestamp:        String,
  pub candidate:        String,
  pub positive:         Value,
  pub negative:         Value,
  pub neutral:          Value,
  pub trending_phrases: String,
  pub headlines:        String,
}

impl RawSentiment {
  pub fn into_breakdown(self) -> Result<SentimentBreakdown> {
    Ok(SentimentBreakdown {
      id:               Some(self.id.to_string()),
      timestamp:        decode_dt(&self.timestamp)?,
      candidate:        self.candidate,
      positive:         decode_number(&self.positive),
      negative:         decode_number(&self.negative),
      neutral:          decode_number(&self.neutral),
      trending_phrases: self.trending_phrases,
      headlines:        self.headlines,
    })
  }
}

/// Raw values read directly from a `state_demographics` row.
pub struct RawDemographics {
  pub state:                 String,
  pub total_population:      Value,
  pub voting_age_population: Value,
  pub registered_voters:     Value,
  pub political_affiliation: String,
  pub tribal_affiliation:    String,
}

impl From<RawDemographics> for StateDemographics {
  fn from(raw: RawDemographics) -> Self {
    Self {
      state:                 raw.state,
      total_population:      decode_count(&raw.total_population),
      voting_age_population: decode_count(&raw.voting_age_population),
      registered_voters:     decode_count(&raw.registered_voters),
      political_affiliation: raw.political_affiliation,
      tribal_affiliation:    raw.tribal_affiliation,
    }
  }
}
