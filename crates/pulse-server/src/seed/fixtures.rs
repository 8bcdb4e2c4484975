//! Synthetic data for `seed test`.

use chrono::{DateTime, Duration, Utc};
use pulse_core::model::{ApprovalRating, Candidate, SentimentBreakdown, StateDemographics};
use rand::Rng;
use strum::IntoEnumIterator as _;

use super::Dataset;

/// Days of approval history, counting back from today inclusive.
pub const HISTORY_DAYS: i64 = 30;

fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

fn base_score(candidate: Candidate) -> f64 {
  match candidate {
    Candidate::Tinubu => 45.0,
    Candidate::Obi => 35.0,
    Candidate::Atiku => 20.0,
  }
}

fn state(
  name: &str,
  total: u64,
  voting_age: u64,
  registered: u64,
  party: &str,
  tribes: &str,
) -> StateDemographics {
  StateDemographics {
    state:                 name.to_owned(),
    total_population:      total,
    voting_age_population: voting_age,
    registered_voters:     registered,
    political_affiliation: party.to_owned(),
    tribal_affiliation:    tribes.to_owned(),
  }
}

pub fn demographics() -> Vec<StateDemographics> {
  vec![
    state("Lagos", 15_000_000, 10_000_000, 7_000_000, "Mixed", "Yoruba, Igbo, Hausa"),
    state("Kano", 12_000_000, 8_000_000, 5_500_000, "APC", "Hausa, Fulani"),
    state("Rivers", 7_000_000, 4_500_000, 3_200_000, "PDP", "Ijaw, Ikwerre, Ogoni"),
    state("Abuja", 3_500_000, 2_400_000, 1_800_000, "Mixed", "Mixed"),
  ]
}

/// One national row per candidate per day: base score ±5, clamped to
/// 0–100, change delta ±2, both to two decimals.
pub fn approval<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<ApprovalRating> {
  let mut rows = Vec::new();
  for days_ago in (0..=HISTORY_DAYS).rev() {
    let timestamp = now - Duration::days(days_ago);
    for candidate in Candidate::iter() {
      let score = (base_score(candidate) + rng.gen_range(-5.0..5.0)).clamp(0.0, 100.0);
      let delta = rng.gen_range(-2.0..2.0);
      rows.push(ApprovalRating::national(timestamp, candidate, round2(score), round2(delta)));
    }
  }
  rows
}

/// One row per candidate: positive 20–60 %, negative 10–40 %, neutral the
/// remainder, stored as fractions.
pub fn sentiment<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Vec<SentimentBreakdown> {
  Candidate::iter()
    .map(|candidate| {
      let positive: f64 = rng.gen_range(20.0..60.0);
      let negative: f64 = rng.gen_range(10.0..40.0);
      let neutral = 100.0 - positive - negative;
      SentimentBreakdown {
        id:               None,
        timestamp:        now,
        candidate:        candidate.to_string(),
        positive:         round2(positive / 100.0),
        negative:         round2(negative / 100.0),
        neutral:          round2(neutral / 100.0),
        trending_phrases: format!("{candidate} policies, economic growth, security"),
        headlines:        format!("Latest sentiment analysis for {candidate}"),
      }
    })
    .collect()
}

pub fn test_dataset<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Dataset {
  Dataset {
    demographics: demographics(),
    approval:     approval(rng, now),
    sentiment:    sentiment(rng, now),
  }
}
