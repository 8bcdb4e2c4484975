//! [`SqliteSource`]: the SQLite implementation of [`DataSource`] and
//! [`PreferenceStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::{debug, warn};

use pulse_core::{
  model::{ApprovalRating, RawInput, SentimentBreakdown, StateDemographics},
  source::{ApprovalQuery, DataSource},
  theme::PreferenceStore,
};

use crate::{
  Error, Result,
  encode::{RawApproval, RawDemographics, RawSentiment, encode_count, encode_dt},
  schema::SCHEMA,
};

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode raw rows, skipping those that fail (e.g. an unparsable timestamp).
fn decode_rows<R, T>(table: &str, raws: Vec<R>, decode: fn(R) -> Result<T>) -> Vec<T> {
  let total = raws.len();
  let out: Vec<T> = raws
    .into_iter()
    .filter_map(|raw| {
      decode(raw)
        .inspect_err(|e: &Error| debug!(table, error = %e, "skipping undecodable row"))
        .ok()
    })
    .collect();
  if out.len() < total {
    warn!(table, skipped = total - out.len(), "rows skipped while decoding");
  }
  out
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A PulseTrack data source backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteSource {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteSource {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let source = Self { conn };
    source.init_schema().await?;
    debug!(path = %path.display(), "opened sqlite source");
    Ok(source)
  }

  /// Open an in-memory database, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let source = Self { conn };
    source.init_schema().await?;
    Ok(source)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of stored opinion submissions.
  pub async fn raw_input_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM raw_inputs", [], |r| r.get(0))?))
      .await?;
    Ok(u64::try_from(n).unwrap_or(0))
  }
}

// ─── DataSource impl ─────────────────────────────────────────────────────────

impl DataSource for SqliteSource {
  type Error = crate::Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn approval_ratings(&self, query: ApprovalQuery) -> Result<Vec<ApprovalRating>> {
    let since_str = query.since.map(encode_dt);

    let raws: Vec<RawApproval> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, timestamp, candidate, rating_score, change_delta, state
           FROM approval_ratings
           WHERE ?1 IS NULL OR timestamp >= ?1
           ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![since_str], |row| {
            Ok(RawApproval {
              id:           row.get(0)?,
              timestamp:    row.get(1)?,
              candidate:    row.get(2)?,
              rating_score: row.get(3)?,
              change_delta: row.get(4)?,
              state:        row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("approval_ratings", raws, RawApproval::into_rating))
  }

  async fn sentiment_breakdown(&self) -> Result<Vec<SentimentBreakdown>> {
    let raws: Vec<RawSentiment> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, timestamp, candidate, positive, negative, neutral,
                  trending_phrases, headlines
           FROM sentiment_breakdown
           ORDER BY timestamp DESC, id ASC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSentiment {
              id:               row.get(0)?,
              timestamp:        row.get(1)?,
              candidate:        row.get(2)?,
              positive:         row.get(3)?,
              negative:         row.get(4)?,
              neutral:          row.get(5)?,
              trending_phrases: row.get(6)?,
              headlines:        row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(decode_rows("sentiment_breakdown", raws, RawSentiment::into_breakdown))
  }

  async fn state_demographics(&self) -> Result<Vec<StateDemographics>> {
    let raws: Vec<RawDemographics> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT state, total_population, voting_age_population, registered_voters,
                  political_affiliation, tribal_affiliation
           FROM state_demographics
           ORDER BY CAST(registered_voters AS REAL) DESC, state ASC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawDemographics {
              state:                 row.get(0)?,
              total_population:      row.get(1)?,
              voting_age_population: row.get(2)?,
              registered_voters:     row.get(3)?,
              political_affiliation: row.get(4)?,
              tribal_affiliation:    row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(StateDemographics::from).collect())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_raw_input(&self, input: RawInput) -> Result<()> {
    let user_id_str   = input.user_id.hyphenated().to_string();
    let timestamp_str = encode_dt(input.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO raw_inputs (source, content, user_id, location, candidate, timestamp)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.source,
            input.content,
            user_id_str,
            input.location,
            input.candidate,
            timestamp_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_approval_rating(&self, row: ApprovalRating) -> Result<()> {
    let timestamp_str = encode_dt(row.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO approval_ratings (timestamp, candidate, rating_score, change_delta, state)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            timestamp_str,
            row.candidate,
            row.rating_score,
            row.change_delta,
            row.state,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_sentiment(&self, row: SentimentBreakdown) -> Result<()> {
    let timestamp_str = encode_dt(row.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sentiment_breakdown (
             timestamp, candidate, positive, negative, neutral, trending_phrases, headlines
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            timestamp_str,
            row.candidate,
            row.positive,
            row.negative,
            row.neutral,
            row.trending_phrases,
            row.headlines,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_demographics(&self, row: StateDemographics) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO state_demographics (
             state, total_population, voting_age_population, registered_voters,
             political_affiliation, tribal_affiliation
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(state) DO UPDATE SET
             total_population      = excluded.total_population,
             voting_age_population = excluded.voting_age_population,
             registered_voters     = excluded.registered_voters,
             political_affiliation = excluded.political_affiliation,
             tribal_affiliation    = excluded.tribal_affiliation",
          rusqlite::params![
            row.state,
            encode_count(row.total_population),
            encode_count(row.voting_age_population),
            encode_count(row.registered_voters),
            row.political_affiliation,
            row.tribal_affiliation,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── PreferenceStore impl ────────────────────────────────────────────────────

impl PreferenceStore for SqliteSource {
  type Error = crate::Error;

  async fn load(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM preferences WHERE key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn save(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_owned();
    let value = value.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO preferences (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
