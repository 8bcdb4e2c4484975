//! [`SupabaseSource`]: the relational adapter, over Supabase's PostgREST
//! endpoint (`{url}/rest/v1/{table}`).

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use pulse_core::{
  model::{ApprovalRating, RawInput, SentimentBreakdown, StateDemographics},
  source::{ApprovalQuery, DataSource},
};

use crate::{
  Error, Result,
  collections::{APPROVAL_RATINGS, RAW_INPUTS, SENTIMENT_BREAKDOWN, STATE_DEMOGRAPHICS},
  http,
};

const BACKEND: &str = "supabase";

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
  /// Project URL, e.g. `https://abcd.supabase.co`.
  #[serde(default)]
  pub url:     String,
  /// The anon (or service-role) key.
  #[serde(default)]
  pub api_key: String,
}

/// PostgREST query parameters for a full-table read.
pub fn read_params(table: &str, since: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
  let order = match table {
    APPROVAL_RATINGS => "timestamp.asc",
    STATE_DEMOGRAPHICS => "registered_voters.desc",
    _ => "timestamp.desc",
  };
  let mut params = vec![("select", "*".to_owned()), ("order", order.to_owned())];
  if let Some(since) = since {
    params.push(("timestamp", format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Micros, true))));
  }
  params
}

/// Decode a PostgREST result set, skipping rows that do not fit `T`.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
  let total = rows.len();
  let out: Vec<T> = rows
    .into_iter()
    .filter_map(|row| {
      serde_json::from_value(row)
        .inspect_err(|e| debug!(table, error = %e, "skipping undecodable row"))
        .ok()
    })
    .collect();
  if out.len() < total {
    warn!(table, skipped = total - out.len(), "rows skipped while decoding");
  }
  out
}

// ─── Source ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SupabaseSource {
  client: Client,
  config: SupabaseConfig,
  rest:   Url,
}

impl SupabaseSource {
  pub fn new(config: SupabaseConfig) -> Result<Self> {
    if config.url.trim().is_empty() {
      return Err(Error::MissingConfiguration("backend.url"));
    }
    if config.api_key.trim().is_empty() {
      return Err(Error::MissingConfiguration("backend.api_key"));
    }
    let base = format!("{}/rest/v1/", config.url.trim_end_matches('/'));
    let rest = Url::parse(&base).map_err(|e| Error::Url(format!("{base}: {e}")))?;

    Ok(Self { client: http::client()?, config, rest })
  }

  pub fn table_url(&self, table: &str) -> Result<Url> {
    self.rest.join(table).map_err(|e| Error::Url(e.to_string()))
  }

  fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
    req
      .header("apikey", &self.config.api_key)
      .bearer_auth(&self.config.api_key)
  }

  async fn select<T: DeserializeOwned>(
    &self,
    table: &str,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<T>> {
    let resp = self
      .authorize(self.client.get(self.table_url(table)?))
      .query(&read_params(table, since))
      .send()
      .await?;
    let rows: Vec<Value> = http::check(BACKEND, resp).await?.json().await?;
    Ok(decode_rows(table, rows))
  }

  async fn insert(&self, table: &str, row: &impl Serialize, upsert_on: Option<&str>) -> Result<()> {
    let mut req = self.authorize(self.client.post(self.table_url(table)?)).json(row);
    req = match upsert_on {
      Some(column) => req.query(&[("on_conflict", column)]).header("Prefer", PREFER_UPSERT),
      None => req.header("Prefer", PREFER_MINIMAL),
    };
    http::check(BACKEND, req.send().await?).await?;
    Ok(())
  }
}

impl DataSource for SupabaseSource {
  type Error = Error;

  async fn approval_ratings(&self, query: ApprovalQuery) -> Result<Vec<ApprovalRating>> {
    self.select(APPROVAL_RATINGS, query.since).await
  }

  async fn sentiment_breakdown(&self) -> Result<Vec<SentimentBreakdown>> {
    self.select(SENTIMENT_BREAKDOWN, None).await
  }

  async fn state_demographics(&self) -> Result<Vec<StateDemographics>> {
    self.select(STATE_DEMOGRAPHICS, None).await
  }

  async fn insert_raw_input(&self, input: RawInput) -> Result<()> {
    self.insert(RAW_INPUTS, &input, None).await
  }

  async fn insert_approval_rating(&self, row: ApprovalRating) -> Result<()> {
    self.insert(APPROVAL_RATINGS, &row, None).await
  }

  async fn insert_sentiment(&self, row: SentimentBreakdown) -> Result<()> {
    self.insert(SENTIMENT_BREAKDOWN, &row, None).await
  }

  async fn upsert_demographics(&self, row: StateDemographics) -> Result<()> {
    self.insert(STATE_DEMOGRAPHICS, &row, Some("state")).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  fn config() -> SupabaseConfig {
    SupabaseConfig { url: "https://abcd.supabase.co/".into(), api_key: "anon".into() }
  }

  #[test]
  fn blank_settings_are_missing_configuration() {
    let no_url = SupabaseSource::new(SupabaseConfig { url: "".into(), ..config() });
    assert!(matches!(no_url.err(), Some(Error::MissingConfiguration("backend.url"))));
    let no_key = SupabaseSource::new(SupabaseConfig { api_key: "  ".into(), ..config() });
    assert!(matches!(no_key.err(), Some(Error::MissingConfiguration("backend.api_key"))));
  }

  #[test]
  fn table_urls_sit_under_rest_v1() {
    let source = SupabaseSource::new(config()).unwrap();
    assert_eq!(
      source.table_url(STATE_DEMOGRAPHICS).unwrap().as_str(),
      "https://abcd.supabase.co/rest/v1/state_demographics"
    );
  }

  #[test]
  fn reads_are_ordered_per_table() {
    let order = |t| read_params(t, None)[1].1.clone();
    assert_eq!(order(APPROVAL_RATINGS), "timestamp.asc");
    assert_eq!(order(SENTIMENT_BREAKDOWN), "timestamp.desc");
    assert_eq!(order(STATE_DEMOGRAPHICS), "registered_voters.desc");
  }

  #[test]
  fn since_becomes_gte_filter() {
    let since = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    let params = read_params(APPROVAL_RATINGS, Some(since));
    assert_eq!(params[2], ("timestamp", "gte.2024-04-01T00:00:00.000000Z".to_owned()));
  }

  #[test]
  fn rows_decode_with_numeric_ids() {
    let rows = vec![
      json!({ "id": 7, "timestamp": "2024-04-02T09:30:00+00:00", "candidate": "Tinubu",
              "rating_score": 47.1, "change_delta": null, "state": "National" }),
      json!({ "id": 8, "candidate": "Tinubu" }),
    ];
    let decoded: Vec<ApprovalRating> = decode_rows(APPROVAL_RATINGS, rows);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].id.as_deref(), Some("7"));
    assert_eq!(decoded[0].change_delta, 0.0);
  }

  #[test]
  fn raw_inputs_serialise_flat() {
    let input = RawInput {
      source:    "user_form".into(),
      content:   "More jobs".into(),
      user_id:   uuid::Uuid::nil(),
      location:  "Kano".into(),
      candidate: "Obi".into(),
      timestamp: Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap(),
    };
    let body = serde_json::to_value(&input).unwrap();
    assert_eq!(body["user_id"], "00000000-0000-0000-0000-000000000000");
    assert_eq!(body["location"], "Kano");
  }
}
