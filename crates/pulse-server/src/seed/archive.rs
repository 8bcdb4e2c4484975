//! The CSV archive read by `seed production`.
//!
//! Each candidate has one file with the columns `Date`, `Sentiment
//! Category`, `Percentage`, `Trending Phrases` and `Example Posts`. A date
//! has one row per category (`Positive`, `Negative`, `Neutral`, and
//! optionally `Headlines`, whose `Percentage` cell carries the headline
//! text).

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, NaiveDate, Utc};
use pulse_core::model::{ApprovalRating, Candidate, SentimentBreakdown};
use tracing::{info, warn};

use super::{Dataset, SeedError};

/// Archive files, in the order they are seeded.
pub const ARCHIVE_FILES: [(&str, Candidate); 3] = [
  ("tinubu.csv", Candidate::Tinubu),
  ("obi.csv", Candidate::Obi),
  ("atiku.csv", Candidate::Atiku),
];

pub type Row = HashMap<String, String>;

// ─── CSV ─────────────────────────────────────────────────────────────────────

/// Parse a CSV document keyed by its header row. Cells are trimmed and
/// missing trailing cells are empty strings.
pub fn parse_csv(text: &str) -> Result<Vec<Row>, csv::Error> {
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(text.as_bytes());
  let headers = reader.headers()?.clone();
  reader
    .records()
    .map(|record| -> Result<Row, csv::Error> {
      let record = record?;
      Ok(
        headers
          .iter()
          .enumerate()
          .map(|(i, h)| (h.to_owned(), record.get(i).unwrap_or_default().to_owned()))
          .collect(),
      )
    })
    .collect()
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Midnight UTC of an archive date. Accepts RFC 3339, `YYYY-MM-DD`,
/// `MM/DD/YYYY`, `January 5, 2023`, `5 January 2023`, `YYYY-MM` and
/// `Month YYYY` (the last two meaning the first of the month).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
    .or_else(|_| NaiveDate::parse_from_str(s, "%B %d, %Y"))
    .or_else(|_| NaiveDate::parse_from_str(s, "%d %B %Y"))
    .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
    .or_else(|_| NaiveDate::parse_from_str(&format!("1 {s}"), "%d %B %Y"))
    .ok()?;
  Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn percentage(cell: &str) -> f64 {
  cell
    .trim()
    .trim_end_matches('%')
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .unwrap_or(0.0)
}

// ─── Grouping ────────────────────────────────────────────────────────────────

/// Rows grouped by `Date`, in order of first appearance.
fn group_by_date(rows: Vec<Row>) -> Vec<(String, Vec<Row>)> {
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut groups: Vec<(String, Vec<Row>)> = Vec::new();
  for row in rows {
    let date = row.get("Date").cloned().unwrap_or_default();
    match index.get(&date) {
      Some(&i) => groups[i].1.push(row),
      None => {
        index.insert(date.clone(), groups.len());
        groups.push((date, vec![row]));
      }
    }
  }
  groups
}

/// The sentiment row and the national approval row for one date.
fn date_rows(
  candidate: Candidate,
  date: &str,
  rows: &[Row],
) -> Option<(SentimentBreakdown, ApprovalRating)> {
  let Some(timestamp) = parse_date(date) else {
    warn!(%candidate, date, "skipping rows with an unreadable date");
    return None;
  };

  let (mut positive, mut negative, mut neutral) = (0.0, 0.0, 0.0);
  let mut headlines = String::new();
  let mut phrases: Vec<&str> = Vec::new();
  for row in rows {
    let cell = |key: &str| row.get(key).map(String::as_str).unwrap_or_default();
    match cell("Sentiment Category") {
      "Positive" => positive = percentage(cell("Percentage")),
      "Negative" => negative = percentage(cell("Percentage")),
      "Neutral" => neutral = percentage(cell("Percentage")),
      "Headlines" => headlines = cell("Percentage").to_owned(),
      _ => {}
    }
    let phrase = cell("Trending Phrases");
    if !phrase.is_empty() {
      phrases.push(phrase);
    }
  }

  if headlines.is_empty() {
    headlines = format!("{candidate} sentiment data for {date}");
  }
  let sentiment = SentimentBreakdown {
    id: None,
    timestamp,
    candidate: candidate.to_string(),
    positive: positive / 100.0,
    negative: negative / 100.0,
    neutral: neutral / 100.0,
    trending_phrases: phrases.join("; "),
    headlines,
  };
  let approval = ApprovalRating::national(timestamp, candidate, positive, 0.0);
  info!(%candidate, date, positive, negative, neutral, "archive date read");
  Some((sentiment, approval))
}

/// Rows derived from one candidate's CSV.
pub fn candidate_rows(
  candidate: Candidate,
  text: &str,
) -> Result<(Vec<SentimentBreakdown>, Vec<ApprovalRating>), csv::Error> {
  Ok(
    group_by_date(parse_csv(text)?)
      .iter()
      .filter_map(|(date, rows)| date_rows(candidate, date, rows))
      .unzip(),
  )
}

/// Read all three archive files from `dir`. Fails before reading anything
/// when any file is missing.
pub fn archive_dataset(dir: &Path) -> Result<Dataset, SeedError> {
  let missing: Vec<String> = ARCHIVE_FILES
    .iter()
    .filter(|(file, _)| !dir.join(file).is_file())
    .map(|(file, _)| (*file).to_owned())
    .collect();
  if !missing.is_empty() {
    return Err(SeedError::MissingFiles { dir: dir.display().to_string(), missing });
  }

  let mut dataset = Dataset::default();
  for (file, candidate) in ARCHIVE_FILES {
    let text = std::fs::read_to_string(dir.join(file))?;
    let (sentiment, approval) = candidate_rows(candidate, &text)?;
    info!(file, %candidate, dates = sentiment.len(), "processed archive file");
    dataset.sentiment.extend(sentiment);
    dataset.approval.extend(approval);
  }
  Ok(dataset)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  const OBI_CSV: &str = "Date,Sentiment Category,Percentage,Trending Phrases,Example Posts
2023-02-01,Positive,48,\"Obidient, youth\",\"\"\"Go Obi\"\", said one\"
2023-02-01,Negative,22,,
2023-02-01,Neutral,30,,
2023-01-01,Positive,41.5,fuel,
2023-01-01,Headlines,\"Obi tours the north, draws crowds\",,
2023-01-01,Negative,20%
";

  #[test]
  fn quoted_fields_keep_commas_and_quotes() {
    let rows = parse_csv(OBI_CSV).unwrap();
    assert_eq!(rows[0]["Trending Phrases"], "Obidient, youth");
    assert_eq!(rows[0]["Example Posts"], "\"Go Obi\", said one");
  }

  #[test]
  fn short_rows_are_padded() {
    let rows = parse_csv(OBI_CSV).unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[5]["Trending Phrases"], "");
    assert_eq!(rows[5]["Example Posts"], "");
  }

  #[test]
  fn quoted_cells_may_span_lines() {
    let text = "Date,Sentiment Category,Percentage,Trending Phrases,Example Posts\r
2023-04-01,Positive,35,tax,\"line one\nline two\"\r
2023-04-01,Negative,25,,\r
";
    let rows = parse_csv(text).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Example Posts"], "line one\nline two");
    assert_eq!(rows[1]["Date"], "2023-04-01");

    let (sentiment, _) = candidate_rows(Candidate::Tinubu, text).unwrap();
    assert_eq!(sentiment.len(), 1);
    assert_eq!(sentiment[0].negative, 0.25);
  }

  #[test]
  fn dates_in_common_formats() {
    let jan = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(parse_date("2023-01-01"), Some(jan));
    assert_eq!(parse_date("01/01/2023"), Some(jan));
    assert_eq!(parse_date("2023-01"), Some(jan));
    assert_eq!(parse_date("January 2023"), Some(jan));
    assert_eq!(parse_date("January 1, 2023"), Some(jan));
    assert_eq!(parse_date("1 January 2023"), Some(jan));
    assert_eq!(parse_date("2023-01-01T00:00:00Z"), Some(jan));
    assert_eq!(parse_date("sometime"), None);
  }

  #[test]
  fn one_row_pair_per_date_in_file_order() {
    let (sentiment, approval) = candidate_rows(Candidate::Obi, OBI_CSV).unwrap();
    assert_eq!(sentiment.len(), 2);
    assert_eq!(approval.len(), 2);

    let feb = &sentiment[0];
    assert_eq!(feb.timestamp, Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap());
    assert_eq!(feb.positive, 0.48);
    assert_eq!(feb.neutral, 0.3);
    assert_eq!(feb.trending_phrases, "Obidient, youth");
    assert_eq!(feb.headlines, "Obi sentiment data for 2023-02-01");

    let jan = &sentiment[1];
    assert_eq!(jan.headlines, "Obi tours the north, draws crowds");
    assert_eq!(jan.negative, 0.2);
    assert_eq!(jan.neutral, 0.0);

    assert_eq!(approval[0].rating_score, Some(48.0));
    assert_eq!(approval[1].rating_score, Some(41.5));
    assert!(approval.iter().all(|a| a.change_delta == 0.0 && a.is_national()));
  }

  #[test]
  fn unreadable_dates_are_skipped() {
    let (sentiment, _) = candidate_rows(
      Candidate::Atiku,
      "Date,Sentiment Category,Percentage\nsoon,Positive,10\n2023-03-01,Positive,12",
    )
    .unwrap();
    assert_eq!(sentiment.len(), 1);
    assert_eq!(sentiment[0].positive, 0.12);
  }

  #[test]
  fn missing_files_are_all_listed() {
    let dir = std::env::temp_dir().join(format!("pulse-archive-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("obi.csv"), OBI_CSV).unwrap();

    let err = archive_dataset(&dir).unwrap_err();
    let SeedError::MissingFiles { missing, .. } = &err else { panic!("{err}") };
    assert_eq!(missing, &["tinubu.csv", "atiku.csv"]);
    assert!(err.to_string().contains("tinubu.csv, obi.csv, atiku.csv"));
    std::fs::remove_dir_all(dir).ok();
  }

  #[test]
  fn full_archive_is_read_in_candidate_order() {
    let dir = std::env::temp_dir().join(format!("pulse-archive-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    for (file, _) in ARCHIVE_FILES {
      std::fs::write(dir.join(file), OBI_CSV).unwrap();
    }

    let dataset = archive_dataset(&dir).unwrap();
    assert!(dataset.demographics.is_empty());
    assert_eq!(dataset.sentiment.len(), 6);
    let candidates: Vec<&str> = dataset.approval.iter().map(|a| a.candidate.as_str()).collect();
    assert_eq!(candidates, ["Tinubu", "Tinubu", "Obi", "Obi", "Atiku", "Atiku"]);
    std::fs::remove_dir_all(dir).ok();
  }
}
