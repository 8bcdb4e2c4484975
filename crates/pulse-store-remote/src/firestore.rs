//! [`FirestoreSource`]: the document-store adapter, over the Firestore REST
//! API (`runQuery` for reads, document create/patch for writes).
//!
//! Firestore wraps every value in a typed envelope (`stringValue`,
//! `integerValue`, `timestampValue`, ...). The codec below converts between
//! those envelopes and plain JSON so the record types deserialise with their
//! usual lenient rules.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
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

const BACKEND: &str = "firestore";
const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Fields written as `timestampValue` rather than `stringValue`.
const TIMESTAMP_FIELDS: &[&str] = &["timestamp"];

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreConfig {
  /// Blank or absent is reported as missing configuration.
  #[serde(default)]
  pub project_id:   String,
  #[serde(default = "default_database")]
  pub database:     String,
  /// Web API key, sent as the `key` query parameter.
  #[serde(default)]
  pub api_key:      Option<String>,
  /// OAuth access token, sent as a bearer token.
  #[serde(default)]
  pub bearer_token: Option<String>,
  /// Override of the REST endpoint, e.g. for the local emulator.
  #[serde(default)]
  pub endpoint:     Option<String>,
}

fn default_database() -> String { "(default)".to_owned() }

// ─── Codec ───────────────────────────────────────────────────────────────────

/// Plain JSON → Firestore value envelope.
pub fn encode_value(value: &Value) -> Value {
  match value {
    Value::Null => json!({ "nullValue": null }),
    Value::Bool(b) => json!({ "booleanValue": b }),
    Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
    Value::Number(n) => json!({ "doubleValue": n }),
    Value::String(s) => json!({ "stringValue": s }),
    Value::Array(items) => {
      json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
    }
    Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map, &[]) } }),
  }
}

fn encode_fields(map: &Map<String, Value>, timestamps: &[&str]) -> Map<String, Value> {
  map
    .iter()
    .map(|(k, v)| {
      let encoded = match v {
        Value::String(s) if timestamps.contains(&k.as_str()) => json!({ "timestampValue": s }),
        other => encode_value(other),
      };
      (k.clone(), encoded)
    })
    .collect()
}

/// A record → `{"fields": {...}}` request body.
pub fn encode_document(record: &impl serde::Serialize) -> Result<Value> {
  match serde_json::to_value(record)? {
    Value::Object(map) => Ok(json!({ "fields": encode_fields(&map, TIMESTAMP_FIELDS) })),
    other => Err(Error::Decode(format!("expected an object, got {other}"))),
  }
}

/// Firestore value envelope → plain JSON. Unknown envelopes become `null`.
pub fn decode_value(value: &Value) -> Value {
  let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
    return Value::Null;
  };
  match kind.as_str() {
    "stringValue" | "timestampValue" | "referenceValue" | "booleanValue" => inner.clone(),
    "doubleValue" => inner.as_f64().map_or(Value::Null, |f| json!(f)),
    "integerValue" => match inner {
      Value::String(s) => s.parse::<i64>().map_or(Value::Null, |i| json!(i)),
      Value::Number(_) => inner.clone(),
      _ => Value::Null,
    },
    "mapValue" => Value::Object(decode_fields(inner.get("fields"))),
    "arrayValue" => Value::Array(
      inner
        .get("values")
        .and_then(Value::as_array)
        .map(|vs| vs.iter().map(decode_value).collect())
        .unwrap_or_default(),
    ),
    _ => Value::Null,
  }
}

fn decode_fields(fields: Option<&Value>) -> Map<String, Value> {
  fields
    .and_then(Value::as_object)
    .map(|f| f.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect())
    .unwrap_or_default()
}

/// A document → its fields as plain JSON, plus `id` from the document name.
pub fn decode_document(doc: &Value) -> Value {
  let mut fields = decode_fields(doc.get("fields"));
  if let Some(id) = doc
    .get("name")
    .and_then(Value::as_str)
    .and_then(|n| n.rsplit('/').next())
  {
    fields.insert("id".to_owned(), json!(id));
  }
  Value::Object(fields)
}

/// Decode a `runQuery` response. Entries without a document (progress
/// markers) are skipped, as are documents that do not fit `T`.
pub fn decode_query_results<T: DeserializeOwned>(collection: &str, rows: &[Value]) -> Vec<T> {
  let mut skipped = 0usize;
  let out = rows
    .iter()
    .filter_map(|row| row.get("document"))
    .filter_map(|doc| match serde_json::from_value(decode_document(doc)) {
      Ok(record) => Some(record),
      Err(e) => {
        skipped += 1;
        debug!(collection, error = %e, "skipping undecodable document");
        None
      }
    })
    .collect();
  if skipped > 0 {
    warn!(collection, skipped, "documents skipped while decoding");
  }
  out
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Direction {
  Ascending,
  Descending,
}

impl Direction {
  fn as_str(self) -> &'static str {
    match self {
      Direction::Ascending => "ASCENDING",
      Direction::Descending => "DESCENDING",
    }
  }
}

/// A `structuredQuery` over one collection with a single ordering.
pub fn structured_query(collection: &str, order_by: &str, direction: Direction) -> Value {
  json!({
    "from": [{ "collectionId": collection }],
    "orderBy": [{ "field": { "fieldPath": order_by }, "direction": direction.as_str() }],
  })
}

/// Approval rows since `since` (inclusive), oldest first.
pub fn approval_query(since: Option<DateTime<Utc>>) -> Value {
  let mut query = structured_query(APPROVAL_RATINGS, "timestamp", Direction::Ascending);
  if let Some(since) = since {
    query["where"] = json!({
      "fieldFilter": {
        "field": { "fieldPath": "timestamp" },
        "op": "GREATER_THAN_OR_EQUAL",
        "value": { "timestampValue": since.to_rfc3339_opts(SecondsFormat::Micros, true) },
      }
    });
  }
  query
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Reads and writes PulseTrack collections in one Firestore database.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct FirestoreSource {
  client:    Client,
  config:    FirestoreConfig,
  documents: String,
}

impl FirestoreSource {
  pub fn new(config: FirestoreConfig) -> Result<Self> {
    if config.project_id.trim().is_empty() {
      return Err(Error::MissingConfiguration("backend.project_id"));
    }
    let endpoint = config
      .endpoint
      .as_deref()
      .unwrap_or(DEFAULT_ENDPOINT)
      .trim_end_matches('/');
    let documents = format!(
      "{endpoint}/projects/{}/databases/{}/documents",
      config.project_id, config.database
    );
    Url::parse(&documents).map_err(|e| Error::Url(e.to_string()))?;

    Ok(Self { client: http::client()?, config, documents })
  }

  /// `{documents}/{segments...}`, each segment percent-encoded.
  pub fn document_url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&self.documents).map_err(|e| Error::Url(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|()| Error::Url(self.documents.clone()))?
      .extend(segments);
    Ok(url)
  }

  fn run_query_url(&self) -> String { format!("{}:runQuery", self.documents) }

  fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
    let req = match &self.config.api_key {
      Some(key) => req.query(&[("key", key)]),
      None => req,
    };
    match &self.config.bearer_token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn run_query<T: DeserializeOwned>(&self, collection: &str, query: Value) -> Result<Vec<T>> {
    let resp = self
      .authorize(self.client.post(self.run_query_url()))
      .json(&json!({ "structuredQuery": query }))
      .send()
      .await?;
    let rows: Vec<Value> = http::check(BACKEND, resp).await?.json().await?;
    Ok(decode_query_results(collection, &rows))
  }

  async fn create(&self, collection: &str, body: Value) -> Result<()> {
    let resp = self
      .authorize(self.client.post(self.document_url(&[collection])?))
      .json(&body)
      .send()
      .await?;
    http::check(BACKEND, resp).await?;
    Ok(())
  }
}

// ─── DataSource impl ─────────────────────────────────────────────────────────

impl DataSource for FirestoreSource {
  type Error = Error;

  async fn approval_ratings(&self, query: ApprovalQuery) -> Result<Vec<ApprovalRating>> {
    self.run_query(APPROVAL_RATINGS, approval_query(query.since)).await
  }

  async fn sentiment_breakdown(&self) -> Result<Vec<SentimentBreakdown>> {
    let query = structured_query(SENTIMENT_BREAKDOWN, "timestamp", Direction::Descending);
    self.run_query(SENTIMENT_BREAKDOWN, query).await
  }

  async fn state_demographics(&self) -> Result<Vec<StateDemographics>> {
    let query = structured_query(STATE_DEMOGRAPHICS, "registered_voters", Direction::Descending);
    self.run_query(STATE_DEMOGRAPHICS, query).await
  }

  async fn insert_raw_input(&self, input: RawInput) -> Result<()> {
    self.create(RAW_INPUTS, encode_document(&input)?).await
  }

  async fn insert_approval_rating(&self, row: ApprovalRating) -> Result<()> {
    self.create(APPROVAL_RATINGS, encode_document(&row)?).await
  }

  async fn insert_sentiment(&self, row: SentimentBreakdown) -> Result<()> {
    self.create(SENTIMENT_BREAKDOWN, encode_document(&row)?).await
  }

  /// The state name is the document id; the whole document is replaced.
  async fn upsert_demographics(&self, row: StateDemographics) -> Result<()> {
    let url = self.document_url(&[STATE_DEMOGRAPHICS, &row.state])?;
    let resp = self
      .authorize(self.client.patch(url))
      .json(&encode_document(&row)?)
      .send()
      .await?;
    http::check(BACKEND, resp).await?;
    Ok(())
  }
}
