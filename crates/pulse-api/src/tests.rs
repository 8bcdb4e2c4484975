//! Router tests against an in-memory source.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  routing::get,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use pulse_core::{
  hooks::{HookOptions, Hooks},
  memory::MemorySource,
  model::{ApprovalRating, Candidate, SentimentBreakdown, StateDemographics},
  opinion::{MISSING_FIELDS_MESSAGE, RETRY_MESSAGE},
  query::QueryOptions,
  theme::{MemoryPreferences, ThemeContext},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use super::*;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn options() -> HookOptions {
  let opts = QueryOptions {
    stale_time:       Duration::from_secs(60),
    refetch_interval: Duration::from_secs(600),
    retry:            0,
    retry_delay:      Duration::from_millis(1),
  };
  HookOptions { volatile: opts, slow: opts }
}

fn demographics(state: &str, registered: u64, party: &str) -> StateDemographics {
  StateDemographics {
    state:                 state.into(),
    total_population:      registered * 2,
    voting_age_population: registered + registered / 2,
    registered_voters:     registered,
    political_affiliation: party.into(),
    tribal_affiliation:    "Mixed".into(),
  }
}

fn seeded() -> MemorySource {
  let now = Utc::now();
  let mut lagos_row = ApprovalRating::national(now, Candidate::Tinubu, 12.0, 0.0);
  lagos_row.state = Some("Lagos".into());
  MemorySource::new()
    .with_approval(vec![
      ApprovalRating::national(
        Utc.with_ymd_and_hms(2023, 1, 10, 0, 0, 0).unwrap(),
        Candidate::Tinubu,
        40.0,
        0.0,
      ),
      ApprovalRating::national(now - ChronoDuration::days(1), Candidate::Tinubu, 45.0, 1.0),
      ApprovalRating::national(now - ChronoDuration::days(1), Candidate::Obi, 36.0, -0.5),
      lagos_row,
    ])
    .with_sentiment(vec![SentimentBreakdown {
      id:               None,
      timestamp:        now,
      candidate:        "Obi".into(),
      positive:         0.5,
      negative:         0.2,
      neutral:          0.3,
      trending_phrases: "Obi policies".into(),
      headlines:        String::new(),
    }])
    .with_demographics(vec![
      demographics("Rivers", 4_500_000, "PDP"),
      demographics("Lagos", 10_000_000, "Mixed"),
      demographics("Kano", 8_000_000, "APC"),
    ])
}

async fn state_with(
  source: MemorySource,
  snapstats: SnapstatsConfig,
  config: ApiConfig,
) -> (AppState<MemorySource, MemoryPreferences>, Arc<MemorySource>) {
  let source = Arc::new(source);
  let state = AppState {
    hooks:     Arc::new(Hooks::new(Arc::clone(&source), options())),
    theme:     Arc::new(ThemeContext::load(MemoryPreferences::default()).await),
    snapstats: Arc::new(Snapstats::new(snapstats, options().slow).unwrap()),
    config:    Arc::new(config),
  };
  (state, source)
}

async fn state() -> (AppState<MemorySource, MemoryPreferences>, Arc<MemorySource>) {
  state_with(seeded(), SnapstatsConfig::default(), ApiConfig::default()).await
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
  let (status, bytes) = send(app, "GET", uri, None).await;
  (status, serde_json::from_slice(&bytes).unwrap())
}

fn temp_file(contents: &str) -> PathBuf {
  let path = std::env::temp_dir().join(format!("pulse-api-{}.json", Uuid::new_v4()));
  std::fs::write(&path, contents).unwrap();
  path
}

const GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature",
   "properties":{"shapeName":"Lagos","Zone":"South West","Typical_Parties":"APC, PDP",
                 "Major_Tribes":"Yoruba","area_km2":3577},
   "geometry":{"type":"Polygon","coordinates":[[[3.0,6.4],[3.7,6.4],[3.7,6.7],[3.0,6.4]]]}},
  {"type":"Feature",
   "properties":{"shapeName":"Kano","zone":"North West","Typical_Parties":"APC, NNPP",
                 "Major_Tribes":"Hausa, Fulani","area_km2":20131},
   "geometry":{"type":"Polygon","coordinates":[[[8.0,11.5],[9.0,11.5],[9.0,12.5],[8.0,11.5]]]}}
]}"#;

fn snapstats_from(path: &Path) -> SnapstatsConfig {
  SnapstatsConfig {
    geojson_url: Some(path.to_string_lossy().into_owned()),
    ..SnapstatsConfig::default()
  }
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthz_is_ok() {
  let (state, _) = state().await;
  let (status, body) = get_json(router(state), "/healthz").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn approval_rows_are_recent_and_national() {
  let (state, _) = state().await;
  let (status, body) = get_json(router(state), "/approval").await;
  assert_eq!(status, StatusCode::OK);
  let rows = body.as_array().unwrap();
  assert_eq!(rows.len(), 2);
  assert!(rows.iter().all(|r| r["state"] == "National"));
}

#[tokio::test]
async fn current_approval_has_one_card_per_candidate() {
  let (state, _) = state().await;
  let (_, body) = get_json(router(state), "/approval/current").await;
  let candidates: Vec<&str> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["candidate"].as_str().unwrap())
    .collect();
  assert_eq!(candidates, ["Tinubu", "Obi"]);
}

#[tokio::test]
async fn trends_bucket_all_time_national_rows_by_month() {
  let (state, _) = state().await;
  let (status, body) = get_json(router(state), "/trends").await;
  assert_eq!(status, StatusCode::OK);
  let buckets = body.as_array().unwrap();
  assert_eq!(buckets[0], json!({ "month": "2023-01", "tinubu": 40.0 }));
  assert!(buckets.len() >= 2);
}

#[tokio::test]
async fn headlines_default_when_blank() {
  let (state, _) = state().await;
  let (_, body) = get_json(router(state), "/headlines").await;
  assert_eq!(body, json!([{ "candidate": "Obi", "headlines": "No headlines." }]));
}

#[tokio::test]
async fn demographics_summary_and_chart() {
  let (state, _) = state().await;
  let app = router(state);

  let (_, summary) = get_json(app.clone(), "/demographics/summary").await;
  assert_eq!(summary["registered_voters"], 22_500_000);

  let (_, chart) = get_json(app, "/demographics/chart").await;
  let states: Vec<&str> = chart
    .as_array()
    .unwrap()
    .iter()
    .map(|b| b["state"].as_str().unwrap())
    .collect();
  assert_eq!(states, ["Lagos", "Kano", "Rivers"]);
  assert_eq!(chart[1]["color"], "#FFC107");
}

#[tokio::test]
async fn selected_states_skip_unknown_names() {
  let (state, _) = state().await;
  let (_, body) = get_json(router(state), "/demographics/states?names=kano,%20Atlantis,Rivers").await;
  let rows = body.as_array().unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0]["state"], "Kano");
  assert_eq!(rows[1]["state"], "Rivers");
}

#[tokio::test]
async fn failed_section_returns_its_notice() {
  let source = seeded();
  source.set_fail_reads(true);
  let (state, _) = state_with(source, SnapstatsConfig::default(), ApiConfig::default()).await;
  let app = router(state);

  let (status, body) = get_json(app.clone(), "/demographics").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["section"], "demographics");
  assert_eq!(body["message"], Section::Demographics.notice());

  let (status, body) = get_json(app.clone(), "/trends").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["message"], Section::Trends.notice());

  let (status, body) = get_json(app, "/opinions/states").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));
}

#[tokio::test]
async fn missing_configuration_is_reported_per_section() {
  let config = ApiConfig {
    dev_mode:              false,
    missing_configuration: Some("backend.project_id".into()),
  };
  let (state, source) = state_with(seeded(), SnapstatsConfig::default(), config).await;
  let (status, body) = get_json(router(state), "/sentiment").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["error"], "missing_configuration");
  assert_eq!(source.reads(), 0);
}

// ─── Opinions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn state_options_are_sorted() {
  let (state, _) = state().await;
  let (_, body) = get_json(router(state), "/opinions/states").await;
  assert_eq!(body, json!(["Kano", "Lagos", "Rivers"]));
}

#[tokio::test]
async fn incomplete_opinion_is_rejected_without_write() {
  let (state, source) = state().await;
  let (status, bytes) = send(
    router(state),
    "POST",
    "/opinions",
    Some(json!({ "candidate": "obi", "location": "Lagos", "content": "   " })),
  )
  .await;
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["message"], MISSING_FIELDS_MESSAGE);
  assert!(source.raw_inputs().is_empty());
}

#[tokio::test]
async fn opinion_is_recorded() {
  let (state, source) = state().await;
  let (status, bytes) = send(
    router(state),
    "POST",
    "/opinions",
    Some(json!({ "candidate": "atiku", "location": "Kano", "content": " Fix the roads " })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["user_id"].is_string());

  let inputs = source.raw_inputs();
  assert_eq!(inputs.len(), 1);
  assert_eq!(inputs[0].content, "Fix the roads");
  assert_eq!(inputs[0].candidate, "Atiku");
  assert_eq!(inputs[0].source, "user_form");
}

#[tokio::test]
async fn rejected_write_shows_generic_retry_message() {
  let source = seeded();
  source.set_fail_writes(true);
  let (state, _) = state_with(source, SnapstatsConfig::default(), ApiConfig::default()).await;
  let (status, bytes) = send(
    router(state),
    "POST",
    "/opinions",
    Some(json!({ "location": "Lagos", "opinion": "More jobs" })),
  )
  .await;
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["message"], RETRY_MESSAGE);
}

// ─── Preferences ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn theme_toggles_and_sets() {
  let (state, _) = state().await;
  let app = router(state);

  let (_, body) = get_json(app.clone(), "/preferences/theme").await;
  assert_eq!(body, json!({ "dark_mode": false }));

  let (_, bytes) = send(app.clone(), "POST", "/preferences/theme/toggle", None).await;
  assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!({ "dark_mode": true }));

  send(app.clone(), "PUT", "/preferences/theme", Some(json!({ "dark_mode": false }))).await;
  let (_, body) = get_json(app, "/preferences/theme").await;
  assert_eq!(body["dark_mode"], false);
}

// ─── Snapstats ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_map_is_missing_configuration() {
  let (state, _) = state().await;
  let (status, body) = get_json(router(state), "/snapstats/view").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["error"], "missing_configuration");
}

#[tokio::test]
async fn table_filters_and_sorts() {
  let path = temp_file(GEOJSON);
  let (state, _) = state_with(seeded(), snapstats_from(&path), ApiConfig::default()).await;
  let app = router(state);

  let (_, rows) = get_json(app.clone(), "/snapstats/features?sort=area&dir=desc").await;
  assert_eq!(rows[0]["state"], "Kano");
  assert_eq!(rows[0]["zone"], "North West");

  let (_, rows) = get_json(app, "/snapstats/features?search=yoruba").await;
  assert_eq!(rows.as_array().unwrap().len(), 1);
  assert_eq!(rows[0]["state"], "Lagos");
  std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn auxiliary_stats_fall_back_to_the_map() {
  let path = temp_file(GEOJSON);
  let mut config = snapstats_from(&path);
  config.zone_stats_url = Some("/nonexistent/zones.json".into());
  let (state, _) = state_with(seeded(), config, ApiConfig::default()).await;
  let app = router(state);

  let (_, zones) = get_json(app.clone(), "/snapstats/zones").await;
  assert_eq!(zones.as_array().unwrap().len(), 2);
  assert_eq!(zones[0]["zone"], "South West");
  assert_eq!(zones[0]["stateCount"], 1.0);

  let (_, parties) = get_json(app.clone(), "/snapstats/parties").await;
  assert_eq!(parties[0], json!({ "party": "APC", "stateCount": 2.0 }));

  let (status, tribes) = get_json(app, "/snapstats/tribes").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(tribes, json!([]));
  std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn remote_tribe_table_is_sorted_by_population() {
  let geo = temp_file(GEOJSON);
  let tribes = temp_file(
    r#"[{"Ethnic_Group":"Igbo","Estimated_Population_Millions":34,"Percentage":15.2},
        {"ethnic_group":"Hausa","estimated_population_millions":"67","percentage":30}]"#,
  );
  let mut config = snapstats_from(&geo);
  config.tribe_stats_url = Some(tribes.to_string_lossy().into_owned());
  let (state, _) = state_with(seeded(), config, ApiConfig::default()).await;

  let (_, body) = get_json(router(state), "/snapstats/tribes").await;
  assert_eq!(body[0]["Ethnic_Group"], "Hausa");
  assert_eq!(body[0]["Estimated_Population_Millions"], 67.0);
  std::fs::remove_file(geo).ok();
  std::fs::remove_file(tribes).ok();
}

#[tokio::test]
async fn map_svg_is_served_as_svg() {
  let path = temp_file(GEOJSON);
  let (state, _) = state_with(seeded(), snapstats_from(&path), ApiConfig::default()).await;
  let req = Request::builder()
    .uri("/snapstats/map.svg?width=600&height=400")
    .body(Body::empty())
    .unwrap();
  let resp = router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/svg+xml");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let svg = String::from_utf8(bytes.to_vec()).unwrap();
  assert!(svg.starts_with("<svg"));
  assert_eq!(svg.matches("<path").count(), 2);
  std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn malformed_geojson_renders_fallback_view() {
  let path = temp_file("{ not geojson");
  let (state, _) = state_with(seeded(), snapstats_from(&path), ApiConfig::default()).await;
  let (status, view) = get_json(router(state), "/snapstats/view").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["bounds"], json!([[4.0, 3.0], [14.0, 14.0]]));
  assert_eq!(view["zoom"], 6);
  assert_eq!(view["projection"], "fallback");
  assert_eq!(view["features"], json!([]));
  std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn unreachable_geojson_is_a_map_notice() {
  let config = SnapstatsConfig {
    geojson_url: Some("/nonexistent/nigeria.geojson".into()),
    ..SnapstatsConfig::default()
  };
  let (state, _) = state_with(seeded(), config, ApiConfig::default()).await;
  let (status, body) = get_json(router(state), "/snapstats/features").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["message"], Section::Map.notice());
}

// ─── Error pages ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_route_offers_recovery_actions() {
  let (state, _) = state().await;
  let (status, body) = get_json(router(state), "/nowhere").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["actions"], json!(["reload", "back"]));
}

async fn boom() -> &'static str { panic!("kaboom") }

#[tokio::test]
async fn panics_become_server_errors() {
  let app = catch_panics(Router::new().route("/boom", get(boom)), false);
  let (status, body) = get_json(app, "/boom").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "server_error");
  assert_eq!(body["message"], error::SERVER_ERROR_MESSAGE);
  assert!(body.get("detail").is_none());

  let app = catch_panics(Router::new().route("/boom", get(boom)), true);
  let (_, body) = get_json(app, "/boom").await;
  assert_eq!(body["detail"], "kaboom");
}
