//! Chart-ready aggregation over raw rows.
//!
//! Everything here is a pure function of its input: no clock, no I/O, no
//! hidden state. Running an aggregation twice on the same rows yields the
//! same output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::warn;

use crate::model::{ApprovalRating, Candidate, SentimentBreakdown, StateDemographics};

// ─── Monthly trend ───────────────────────────────────────────────────────────

/// One calendar month of the approval trend chart.
///
/// A charted candidate with no rows in the month is absent from `values` (and
/// from the serialised object), so a line chart connects across the gap
/// instead of dipping to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
  /// `YYYY-MM`.
  pub month:  String,
  #[serde(flatten)]
  pub values: BTreeMap<Candidate, f64>,
}

impl MonthlyBucket {
  pub fn get(&self, candidate: Candidate) -> Option<f64> {
    self.values.get(&candidate).copied()
  }
}

/// Bucket key for a timestamp: the first day of its calendar month, as
/// `YYYY-MM`. Zero-padded and fixed-width, so string order is month order.
pub fn month_key(ts: DateTime<Utc>) -> String {
  format!("{:04}-{:02}", ts.year(), ts.month())
}

/// Average approval per charted candidate per calendar month.
///
/// Every distinct month in `rows` gets exactly one bucket, even when only
/// uncharted candidates appear in it. Missing or non-numeric scores count
/// as 0 and are reported with a warning.
pub fn monthly_trends(rows: &[ApprovalRating]) -> Vec<MonthlyBucket> {
  let mut buckets: BTreeMap<String, BTreeMap<Candidate, (f64, u32)>> =
    BTreeMap::new();
  let mut coerced = 0usize;

  for row in rows {
    let bucket = buckets.entry(month_key(row.timestamp)).or_default();
    let Some(candidate) = charted(&row.candidate) else {
      continue;
    };
    let score = match row.rating_score {
      Some(score) => score,
      None => {
        coerced += 1;
        0.0
      }
    };
    let (sum, count) = bucket.entry(candidate).or_insert((0.0, 0));
    *sum += score;
    *count += 1;
  }

  if coerced > 0 {
    warn!(coerced, "approval rows without a numeric rating_score counted as 0");
  }

  buckets
    .into_iter()
    .map(|(month, sums)| MonthlyBucket {
      month,
      values: sums
        .into_iter()
        .map(|(candidate, (sum, count))| (candidate, sum / f64::from(count)))
        .collect(),
    })
    .collect()
}

fn charted(name: &str) -> Option<Candidate> {
  Candidate::parse(name).ok().filter(|c| c.is_charted())
}

// ─── Latest per candidate ────────────────────────────────────────────────────

/// Identity of a candidate name: the parsed candidate when it is known,
/// otherwise the lowercased name.
fn candidate_key(name: &str) -> String {
  match Candidate::parse(name.trim()) {
    Ok(candidate) => candidate.to_string(),
    Err(_) => name.trim().to_lowercase(),
  }
}

/// Keep one row per candidate, in order of first appearance, letting
/// `replace` decide whether a later row overwrites the kept one.
fn one_per_candidate<T: Clone>(rows: &[T], name: impl Fn(&T) -> &str, replace: bool) -> Vec<T> {
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut out: Vec<T> = Vec::new();
  for row in rows {
    let key = candidate_key(name(row));
    match index.get(&key) {
      Some(&i) if replace => out[i] = row.clone(),
      Some(_) => {}
      None => {
        index.insert(key, out.len());
        out.push(row.clone());
      }
    }
  }
  out
}

/// Current approval card per candidate. `rows` are oldest first, so the last
/// row for a candidate wins.
pub fn latest_by_candidate(rows: &[ApprovalRating]) -> Vec<ApprovalRating> {
  one_per_candidate(rows, |r| r.candidate.as_str(), true)
}

/// Latest sentiment per candidate. `rows` are newest first, so the first row
/// for a candidate wins.
pub fn latest_sentiment_by_candidate(
  rows: &[SentimentBreakdown],
) -> Vec<SentimentBreakdown> {
  one_per_candidate(rows, |r| r.candidate.as_str(), false)
}

/// Headline text shown for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
  pub candidate: String,
  pub headlines: String,
}

/// Latest headlines per candidate from newest-first sentiment rows.
pub fn headlines(rows: &[SentimentBreakdown]) -> Vec<Headline> {
  latest_sentiment_by_candidate(rows)
    .into_iter()
    .map(|r| Headline {
      headlines: if r.headlines.trim().is_empty() {
        "No headlines.".to_owned()
      } else {
        r.headlines
      },
      candidate: r.candidate,
    })
    .collect()
}

// ─── Demographics ────────────────────────────────────────────────────────────

/// Registered voters as a percentage of the voting-age population; 0 when the
/// voting-age population is 0.
pub fn registration_rate(registered_voters: u64, voting_age_population: u64) -> f64 {
  if voting_age_population == 0 {
    return 0.0;
  }
  registered_voters as f64 * 100.0 / voting_age_population as f64
}

/// Display form of a rate, one decimal place: `70.0%`.
pub fn format_rate(rate: f64) -> String { format!("{rate:.1}%") }

/// Nationwide totals across all demographics rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DemographicsSummary {
  pub total_population:      u64,
  pub voting_age_population: u64,
  pub registered_voters:     u64,
  pub registration_rate:     f64,
}

impl DemographicsSummary {
  pub fn from_rows(rows: &[StateDemographics]) -> Self {
    let (total, voting_age, registered) =
      rows.iter().fold((0u64, 0u64, 0u64), |(t, v, r), row| {
        (
          t.saturating_add(row.total_population),
          v.saturating_add(row.voting_age_population),
          r.saturating_add(row.registered_voters),
        )
      });
    Self {
      total_population:      total,
      voting_age_population: voting_age,
      registered_voters:     registered,
      registration_rate:     registration_rate(registered, voting_age),
    }
  }
}

/// Detail card for one selected state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDetail {
  pub state:             String,
  pub total_population:  u64,
  pub registered_voters: u64,
  pub registration_rate: f64,
}

impl From<&StateDemographics> for StateDetail {
  fn from(row: &StateDemographics) -> Self {
    Self {
      state:             row.state.clone(),
      total_population:  row.total_population,
      registered_voters: row.registered_voters,
      registration_rate: registration_rate(
        row.registered_voters,
        row.voting_age_population,
      ),
    }
  }
}

/// Case-insensitive lookup of a state by name.
pub fn find_state<'a>(
  rows: &'a [StateDemographics],
  name: &str,
) -> Option<&'a StateDemographics> {
  rows.iter().find(|r| r.state.eq_ignore_ascii_case(name))
}

/// Detail cards for the selected states, in selection order. Unknown names
/// are skipped.
pub fn state_details(rows: &[StateDemographics], names: &[String]) -> Vec<StateDetail> {
  names
    .iter()
    .filter_map(|name| find_state(rows, name))
    .map(StateDetail::from)
    .collect()
}

/// Bar colour for a state's dominant party.
pub fn party_color(affiliation: &str) -> &'static str {
  let k = affiliation.to_ascii_lowercase();
  if k.contains("lp") {
    "#008753"
  } else if k.contains("apc") {
    "#FFC107"
  } else if k.contains("pdp") {
    "#DC3545"
  } else if k.contains("nnpp") {
    "#0D6EFD"
  } else {
    "#6C757D"
  }
}

/// One bar of the registered-voters chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterBar {
  pub state:                 String,
  pub registered_voters:     u64,
  pub political_affiliation: String,
  pub color:                 &'static str,
}

/// Registered-voter bars, largest first.
pub fn voter_bars(rows: &[StateDemographics]) -> Vec<VoterBar> {
  let mut bars: Vec<VoterBar> = rows
    .iter()
    .map(|r| VoterBar {
      state:                 r.state.clone(),
      registered_voters:     r.registered_voters,
      political_affiliation: r.political_affiliation.clone(),
      color:                 party_color(&r.political_affiliation),
    })
    .collect();
  bars.sort_by(|a, b| b.registered_voters.cmp(&a.registered_voters));
  bars
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
  }

  fn rating(ts: DateTime<Utc>, candidate: &str, score: Option<f64>) -> ApprovalRating {
    ApprovalRating {
      id: None,
      timestamp: ts,
      candidate: candidate.into(),
      rating_score: score,
      change_delta: 0.0,
      state: Some("National".into()),
    }
  }

  fn demo(state: &str, registered: u64, voting_age: u64, party: &str) -> StateDemographics {
    StateDemographics {
      state:                 state.into(),
      total_population:      voting_age * 3 / 2,
      voting_age_population: voting_age,
      registered_voters:     registered,
      political_affiliation: party.into(),
      tribal_affiliation:    String::new(),
    }
  }

  // ── Monthly trends ───────────────────────────────────────────────────────

  #[test]
  fn empty_input_yields_empty_output() {
    assert!(monthly_trends(&[]).is_empty());
  }

  #[test]
  fn same_month_scores_are_averaged() {
    let rows = vec![
      rating(at(2024, 1, 3), "tinubu", Some(40.0)),
      rating(at(2024, 1, 28), "Tinubu", Some(50.0)),
    ];
    let out = monthly_trends(&rows);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].month, "2024-01");
    assert_eq!(out[0].get(Candidate::Tinubu), Some(45.0));
    assert_eq!(out[0].get(Candidate::Obi), None);
  }

  #[test]
  fn one_sorted_bucket_per_distinct_month() {
    let rows = vec![
      rating(at(2024, 11, 1), "Obi", Some(30.0)),
      rating(at(2023, 12, 31), "Tinubu", Some(44.0)),
      rating(at(2024, 2, 10), "Atiku", Some(20.0)),
      rating(at(2024, 11, 20), "Obi", Some(34.0)),
    ];
    let out = monthly_trends(&rows);
    let months: Vec<&str> = out.iter().map(|b| b.month.as_str()).collect();
    assert_eq!(months, ["2023-12", "2024-02", "2024-11"]);

    // Atiku-only month still has a bucket, but no charted values.
    assert!(out[1].values.is_empty());
    assert_eq!(out[2].get(Candidate::Obi), Some(32.0));
  }

  #[test]
  fn missing_candidate_is_absent_not_zero() {
    let rows = vec![rating(at(2024, 3, 1), "Obi", Some(36.0))];
    let out = monthly_trends(&rows);
    let json = serde_json::to_value(&out[0]).unwrap();
    assert_eq!(json["month"], "2024-03");
    assert_eq!(json["obi"], 36.0);
    assert!(json.get("tinubu").is_none());
  }

  #[test]
  fn non_numeric_scores_count_as_zero() {
    let rows = vec![
      rating(at(2024, 5, 1), "Tinubu", Some(60.0)),
      rating(at(2024, 5, 2), "Tinubu", None),
    ];
    assert_eq!(monthly_trends(&rows)[0].get(Candidate::Tinubu), Some(30.0));
  }

  #[test]
  fn aggregation_is_idempotent() {
    let rows = vec![
      rating(at(2024, 1, 1), "Tinubu", Some(41.0)),
      rating(at(2024, 2, 1), "Obi", Some(33.0)),
      rating(at(2024, 2, 9), "Tinubu", Some(47.0)),
    ];
    assert_eq!(monthly_trends(&rows), monthly_trends(&rows));
  }

  // ── Latest per candidate ─────────────────────────────────────────────────

  #[test]
  fn latest_approval_is_last_row_in_first_seen_order() {
    let rows = vec![
      rating(at(2024, 1, 1), "Tinubu", Some(40.0)),
      rating(at(2024, 1, 1), "Obi", Some(30.0)),
      rating(at(2024, 1, 2), "Tinubu", Some(42.0)),
    ];
    let latest = latest_by_candidate(&rows);
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].candidate, "Tinubu");
    assert_eq!(latest[0].rating_score, Some(42.0));
    assert_eq!(latest[1].candidate, "Obi");
  }

  #[test]
  fn candidate_names_match_case_insensitively() {
    let rows = vec![
      rating(at(2024, 1, 1), "Tinubu", Some(40.0)),
      rating(at(2024, 1, 2), "tinubu", Some(43.0)),
      rating(at(2024, 1, 2), "Sowore", Some(5.0)),
      rating(at(2024, 1, 3), "SOWORE", Some(6.0)),
    ];
    let latest = latest_by_candidate(&rows);
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].rating_score, Some(43.0));
    assert_eq!(latest[1].rating_score, Some(6.0));
  }

  #[test]
  fn headlines_take_newest_row_and_default_when_blank() {
    let row = |candidate: &str, headlines: &str| SentimentBreakdown {
      id:               None,
      timestamp:        at(2024, 1, 1),
      candidate:        candidate.into(),
      positive:         0.5,
      negative:         0.3,
      neutral:          0.2,
      trending_phrases: String::new(),
      headlines:        headlines.into(),
    };
    let rows = vec![row("Obi", "newest"), row("Atiku", ""), row("Obi", "older")];
    let out = headlines(&rows);
    assert_eq!(out[0], Headline { candidate: "Obi".into(), headlines: "newest".into() });
    assert_eq!(out[1].headlines, "No headlines.");
  }

  // ── Demographics ─────────────────────────────────────────────────────────

  #[test]
  fn lagos_registration_rate_is_seventy_percent() {
    let rows = vec![demo("Lagos", 7_000_000, 10_000_000, "Mixed")];
    let detail = StateDetail::from(&rows[0]);
    assert_eq!(detail.registration_rate, 70.0);
    assert_eq!(format_rate(detail.registration_rate), "70.0%");
  }

  #[test]
  fn zero_voting_age_population_rate_is_zero() {
    assert_eq!(registration_rate(10, 0), 0.0);
  }

  #[test]
  fn summary_totals_all_states() {
    let rows = vec![
      demo("Lagos", 7_000_000, 10_000_000, "Mixed"),
      demo("Kano", 5_000_000, 10_000_000, "APC"),
    ];
    let summary = DemographicsSummary::from_rows(&rows);
    assert_eq!(summary.registered_voters, 12_000_000);
    assert_eq!(summary.voting_age_population, 20_000_000);
    assert_eq!(summary.registration_rate, 60.0);
    assert_eq!(DemographicsSummary::from_rows(&[]).registration_rate, 0.0);
  }

  #[test]
  fn state_details_match_case_insensitively_and_skip_unknown() {
    let rows = vec![demo("Lagos", 7, 10, ""), demo("Kano", 5, 8, "")];
    let details =
      state_details(&rows, &["kano".into(), "Atlantis".into(), "LAGOS".into()]);
    let names: Vec<&str> = details.iter().map(|d| d.state.as_str()).collect();
    assert_eq!(names, ["Kano", "Lagos"]);
  }

  #[test]
  fn voter_bars_sorted_and_coloured_by_party() {
    let rows = vec![
      demo("Rivers", 3_200_000, 4_500_000, "PDP"),
      demo("Kano", 5_500_000, 8_000_000, "APC"),
      demo("Abuja", 1_800_000, 2_400_000, "Mixed"),
    ];
    let bars = voter_bars(&rows);
    assert_eq!(bars[0].state, "Kano");
    assert_eq!(bars[0].color, "#FFC107");
    assert_eq!(bars[1].color, "#DC3545");
    assert_eq!(bars[2].color, "#6C757D");
    assert_eq!(party_color("Labour (LP)"), "#008753");
    assert_eq!(party_color("NNPP"), "#0D6EFD");
  }
}
