//! Snapstats: the state map, the state table and the auxiliary statistics.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/snapstats/features` | `?search=&sort=state\|zone\|area\|parties\|tribes&dir=asc\|desc` |
//! | `GET` | `/snapstats/zones` | remote table, else computed from the map |
//! | `GET` | `/snapstats/parties` | remote table, else computed from the map |
//! | `GET` | `/snapstats/tribes` | remote table, else empty |
//! | `GET` | `/snapstats/map.svg` | `?width=&height=` |
//! | `GET` | `/snapstats/view` | bounds, centre and per-state style for a tile map |
//!
//! Assets are read from an `http(s)://` URL or a local path and cached with
//! the static-data query options. Malformed GeoJSON is an empty map, never
//! an error.

use std::{sync::Arc, time::Duration};

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use pulse_core::{
  query::{CachedQuery, PollHandle, QueryOptions},
  source::DataSource,
};
use pulse_geo::{
  FeatureCollection, MapView, render_svg,
  stats::{
    PartyStat, SortDir, SortKey, TableRow, TribeStat, ZoneStat, filter_features, party_stats,
    sort_features, sort_parties, sort_tribes, zone_stats,
  },
};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

use crate::{
  AppState,
  error::{ApiError, Section},
};

const DEFAULT_WIDTH: f64 = 800.0;
const DEFAULT_HEIGHT: f64 = 500.0;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Configuration ───────────────────────────────────────────────────────────

/// Where the Snapstats assets live. Each entry is a URL or a file path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapstatsConfig {
  #[serde(default)]
  pub geojson_url:     Option<String>,
  #[serde(default)]
  pub zone_stats_url:  Option<String>,
  #[serde(default)]
  pub party_stats_url: Option<String>,
  #[serde(default)]
  pub tribe_stats_url: Option<String>,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

async fn load_text(client: &Client, location: &str) -> Result<String, LoadError> {
  if location.starts_with("http://") || location.starts_with("https://") {
    Ok(client.get(location).send().await?.error_for_status()?.text().await?)
  } else {
    Ok(tokio::fs::read_to_string(location).await?)
  }
}

async fn load_features(client: Client, location: String) -> Result<FeatureCollection, LoadError> {
  let text = load_text(&client, &location).await?;
  Ok(FeatureCollection::from_json(&text).unwrap_or_else(|e| {
    warn!(location, error = %e, "malformed GeoJSON, rendering an empty map");
    FeatureCollection::default()
  }))
}

async fn load_table<T: DeserializeOwned>(client: Client, location: String) -> Result<Vec<T>, LoadError> {
  let text = load_text(&client, &location).await?;
  Ok(serde_json::from_str(&text)?)
}

/// The cached Snapstats assets.
pub struct Snapstats {
  config:   SnapstatsConfig,
  client:   Client,
  features: Arc<CachedQuery<FeatureCollection>>,
  zones:    CachedQuery<Vec<ZoneStat>>,
  parties:  CachedQuery<Vec<PartyStat>>,
  tribes:   CachedQuery<Vec<TribeStat>>,
}

impl Snapstats {
  pub fn new(config: SnapstatsConfig, options: QueryOptions) -> Result<Self, LoadError> {
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    // Optional tables fall back immediately; retrying them only delays the page.
    let tables = QueryOptions { retry: 0, ..options };
    Ok(Self {
      config,
      client,
      features: Arc::new(CachedQuery::new("snapstats/geojson", options)),
      zones: CachedQuery::new("snapstats/zones", tables),
      parties: CachedQuery::new("snapstats/parties", tables),
      tribes: CachedQuery::new("snapstats/tribes", tables),
    })
  }

  pub fn config(&self) -> &SnapstatsConfig { &self.config }

  /// The state boundaries. Errors only when unconfigured or unreachable.
  pub async fn features(&self) -> Result<Arc<FeatureCollection>, ApiError> {
    let Some(location) = self.config.geojson_url.clone() else {
      return Err(ApiError::MissingConfiguration("snapstats.geojson_url".to_owned()));
    };
    let client = self.client.clone();
    self
      .features
      .get(move || load_features(client.clone(), location.clone()))
      .await
      .data
      .ok_or(ApiError::section(Section::Map))
  }

  async fn table<T>(&self, query: &CachedQuery<Vec<T>>, location: Option<&String>) -> Option<Arc<Vec<T>>>
  where
    T: DeserializeOwned + Send + Sync + 'static,
  {
    let location = location?.clone();
    let client = self.client.clone();
    query
      .get(move || load_table::<T>(client.clone(), location.clone()))
      .await
      .data
  }

  pub async fn zones(&self) -> Result<Vec<ZoneStat>, ApiError> {
    if let Some(rows) = self.table(&self.zones, self.config.zone_stats_url.as_ref()).await {
      return Ok(rows.as_ref().clone());
    }
    Ok(zone_stats(&self.features().await?.features))
  }

  pub async fn parties(&self) -> Result<Vec<PartyStat>, ApiError> {
    if let Some(rows) = self.table(&self.parties, self.config.party_stats_url.as_ref()).await {
      let mut rows = rows.as_ref().clone();
      sort_parties(&mut rows);
      return Ok(rows);
    }
    Ok(party_stats(&self.features().await?.features))
  }

  /// Ethnic-group table; there is nothing to compute it from locally.
  pub async fn tribes(&self) -> Vec<TribeStat> {
    let mut rows = self
      .table(&self.tribes, self.config.tribe_stats_url.as_ref())
      .await
      .map(|rows| rows.as_ref().clone())
      .unwrap_or_default();
    sort_tribes(&mut rows);
    rows
  }

  /// Periodically refresh the boundaries. `None` when unconfigured.
  pub fn start_polling(&self) -> Option<PollHandle> {
    let location = self.config.geojson_url.clone()?;
    let client = self.client.clone();
    Some(
      self
        .features
        .spawn_polling(move || load_features(client.clone(), location.clone())),
    )
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TableParams {
  #[serde(default)]
  pub search: String,
  pub sort:   Option<SortKey>,
  #[serde(default)]
  pub dir:    SortDir,
}

/// `GET /snapstats/features`
pub async fn features<S, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<TableParams>,
) -> Result<Json<Vec<TableRow>>, ApiError>
where
  S: DataSource + 'static,
{
  let collection = state.snapstats.features().await?;
  let mut rows = filter_features(&collection.features, &params.search);
  if let Some(key) = params.sort {
    sort_features(&mut rows, key, params.dir);
  }
  Ok(Json(rows.into_iter().map(TableRow::from).collect()))
}

/// `GET /snapstats/zones`
pub async fn zones<S, P>(State(state): State<AppState<S, P>>) -> Result<Json<Vec<ZoneStat>>, ApiError>
where
  S: DataSource + 'static,
{
  Ok(Json(state.snapstats.zones().await?))
}

/// `GET /snapstats/parties`
pub async fn parties<S, P>(
  State(state): State<AppState<S, P>>,
) -> Result<Json<Vec<PartyStat>>, ApiError>
where
  S: DataSource + 'static,
{
  Ok(Json(state.snapstats.parties().await?))
}

/// `GET /snapstats/tribes`
pub async fn tribes<S, P>(State(state): State<AppState<S, P>>) -> Json<Vec<TribeStat>>
where
  S: DataSource + 'static,
{
  Json(state.snapstats.tribes().await)
}

#[derive(Debug, Default, Deserialize)]
pub struct CanvasParams {
  pub width:  Option<f64>,
  pub height: Option<f64>,
}

impl CanvasParams {
  fn size(&self) -> (f64, f64) {
    (self.width.unwrap_or(DEFAULT_WIDTH), self.height.unwrap_or(DEFAULT_HEIGHT))
  }
}

/// `GET /snapstats/map.svg`
pub async fn map_svg<S, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<CanvasParams>,
) -> Result<Response, ApiError>
where
  S: DataSource + 'static,
{
  let collection = state.snapstats.features().await?;
  let (width, height) = params.size();
  let svg = render_svg(&collection.features, width, height).map_err(|e| {
    warn!(error = %e, "map rendering failed");
    ApiError::section(Section::Map)
  })?;
  Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

/// `GET /snapstats/view`
pub async fn view<S, P>(
  State(state): State<AppState<S, P>>,
  Query(params): Query<CanvasParams>,
) -> Result<Json<MapView>, ApiError>
where
  S: DataSource + 'static,
{
  let collection = state.snapstats.features().await?;
  let (width, height) = params.size();
  Ok(Json(MapView::new(&collection.features, width, height)))
}
