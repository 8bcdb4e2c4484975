//! Snapstats tables and statistics: the searchable state table and the
//! zone, party and tribe summaries.
//!
//! Zone and party statistics can come from published tables; when those are
//! not configured they are computed from the feature properties.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::geojson::{Feature, tokens};

// ─── State table ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
  pub state:    String,
  pub zone:     String,
  pub parties:  String,
  pub tribes:   String,
  pub area_km2: f64,
}

impl From<&Feature> for TableRow {
  fn from(f: &Feature) -> Self {
    Self {
      state:    f.name().unwrap_or_default(),
      zone:     f.zone().unwrap_or_default().to_owned(),
      parties:  f.parties().unwrap_or_default(),
      tribes:   f.tribes().unwrap_or_default(),
      area_km2: f.area_km2(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortKey {
  State,
  Zone,
  Area,
  /// Number of parties listed.
  Parties,
  /// Number of tribes listed.
  Tribes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDir {
  #[default]
  Asc,
  Desc,
}

/// Features whose name, zone, parties or tribes contain `search`,
/// ignoring case. A blank search keeps everything.
pub fn filter_features<'a>(features: &'a [Feature], search: &str) -> Vec<&'a Feature> {
  let needle = search.trim().to_lowercase();
  if needle.is_empty() {
    return features.iter().collect();
  }
  features
    .iter()
    .filter(|f| {
      [f.name(), f.zone().map(str::to_owned), f.parties(), f.tribes()]
        .into_iter()
        .flatten()
        .any(|v| v.to_lowercase().contains(&needle))
    })
    .collect()
}

fn token_count(list: Option<String>) -> usize {
  list.as_deref().map_or(0, |l| tokens(l).count())
}

fn compare(a: &Feature, b: &Feature, key: SortKey) -> Ordering {
  let lower = |v: Option<String>| v.unwrap_or_default().to_lowercase();
  match key {
    SortKey::State => lower(a.name()).cmp(&lower(b.name())),
    SortKey::Zone => lower(a.zone().map(str::to_owned)).cmp(&lower(b.zone().map(str::to_owned))),
    SortKey::Area => a.area_km2().total_cmp(&b.area_km2()),
    SortKey::Parties => token_count(a.parties()).cmp(&token_count(b.parties())),
    SortKey::Tribes => token_count(a.tribes()).cmp(&token_count(b.tribes())),
  }
}

/// Stable sort; ties keep their order in both directions.
pub fn sort_features(rows: &mut [&Feature], key: SortKey, dir: SortDir) {
  rows.sort_by(|a, b| {
    let ord = compare(a, b, key);
    match dir {
      SortDir::Asc => ord,
      SortDir::Desc => ord.reverse(),
    }
  });
}

// ─── Lenient fields ──────────────────────────────────────────────────────────

fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  let n = match Value::deserialize(d)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  Ok(n.filter(|n| n.is_finite()).unwrap_or(0.0))
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(match Value::deserialize(d)? {
    Value::String(s) => s,
    Value::Number(n) => n.to_string(),
    _ => String::new(),
  })
}

// ─── Zones ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStat {
  #[serde(alias = "Zone", default, deserialize_with = "text")]
  pub zone:        String,
  #[serde(default, deserialize_with = "number")]
  pub state_count: f64,
  #[serde(default, deserialize_with = "number")]
  pub total_area:  f64,
}

/// Zone used for features without one.
pub const UNKNOWN_ZONE: &str = "Unknown";

/// State count and total area per zone, in order of first appearance.
pub fn zone_stats(features: &[Feature]) -> Vec<ZoneStat> {
  let mut stats: Vec<ZoneStat> = Vec::new();
  for f in features {
    let zone = f.zone().unwrap_or(UNKNOWN_ZONE);
    let i = match stats.iter().position(|s| s.zone == zone) {
      Some(i) => i,
      None => {
        stats.push(ZoneStat { zone: zone.to_owned(), state_count: 0.0, total_area: 0.0 });
        stats.len() - 1
      }
    };
    stats[i].state_count += 1.0;
    stats[i].total_area += f.area_km2();
  }
  stats
}

// ─── Parties ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStat {
  #[serde(default, deserialize_with = "text")]
  pub party:       String,
  #[serde(default, deserialize_with = "number")]
  pub state_count: f64,
}

/// Number of states listing each party, most common first. A party listed
/// twice by one state counts once.
pub fn party_stats(features: &[Feature]) -> Vec<PartyStat> {
  let mut stats: Vec<PartyStat> = Vec::new();
  for parties in features.iter().filter_map(Feature::parties) {
    let mut seen: Vec<&str> = Vec::new();
    for party in tokens(&parties) {
      if seen.contains(&party) {
        continue;
      }
      seen.push(party);
      match stats.iter_mut().find(|s| s.party == party) {
        Some(s) => s.state_count += 1.0,
        None => stats.push(PartyStat { party: party.to_owned(), state_count: 1.0 }),
      }
    }
  }
  sort_parties(&mut stats);
  stats
}

pub fn sort_parties(stats: &mut [PartyStat]) {
  stats.sort_by(|a, b| b.state_count.total_cmp(&a.state_count));
}

// ─── Tribes ──────────────────────────────────────────────────────────────────

/// One row of the ethnic-group table. Accepts `Pascal_Case` or
/// `snake_case` keys and serialises as `Pascal_Case`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribeStat {
  #[serde(rename = "Ethnic_Group", alias = "ethnic_group", default, deserialize_with = "text")]
  pub ethnic_group: String,
  #[serde(
    rename = "Estimated_Population_Millions",
    alias = "estimated_population_millions",
    default,
    deserialize_with = "number"
  )]
  pub estimated_population_millions: f64,
  #[serde(rename = "Percentage", alias = "percentage", default, deserialize_with = "number")]
  pub percentage: f64,
  #[serde(rename = "Main_States", alias = "main_states", default, deserialize_with = "text")]
  pub main_states: String,
  #[serde(rename = "Main_Zones", alias = "main_zones", default, deserialize_with = "text")]
  pub main_zones: String,
}

/// Largest population first.
pub fn sort_tribes(rows: &mut [TribeStat]) {
  rows.sort_by(|a, b| {
    b.estimated_population_millions
      .total_cmp(&a.estimated_population_millions)
  });
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::geojson::FeatureCollection;

  fn features() -> Vec<Feature> {
    FeatureCollection::from_value(&json!({
      "features": [
        { "properties": { "shapeName": "Lagos", "Zone": "South West",
                          "Typical_Parties": "APC, LP, PDP", "Major_Tribes": "Yoruba",
                          "area_km2": 3345 } },
        { "properties": { "shapeName": "kano", "zone": "North West",
                          "Typical_Parties": "APC, NNPP, APC", "Major_Tribes": "Hausa, Fulani",
                          "area_km2": 20131 } },
        { "properties": { "shapeName": "Oyo", "Zone": "South West",
                          "Typical_Parties": "PDP", "Major_Tribes": "Yoruba",
                          "area_km2": "28454" } },
        { "properties": { "shapeName": "Mystery" } }
      ]
    }))
    .features
  }

  fn names(rows: &[&Feature]) -> Vec<String> {
    rows.iter().filter_map(|f| f.name()).collect()
  }

  #[test]
  fn search_matches_any_column_ignoring_case() {
    let fs = features();
    assert_eq!(names(&filter_features(&fs, "  yoruba ")), ["Lagos", "Oyo"]);
    assert_eq!(names(&filter_features(&fs, "north west")), ["kano"]);
    assert_eq!(names(&filter_features(&fs, "nnpp")), ["kano"]);
    assert_eq!(filter_features(&fs, "").len(), 4);
    assert!(filter_features(&fs, "zzz").is_empty());
  }

  #[test]
  fn sort_by_name_is_case_insensitive() {
    let fs = features();
    let mut rows = filter_features(&fs, "");
    sort_features(&mut rows, SortKey::State, SortDir::Asc);
    assert_eq!(names(&rows), ["kano", "Lagos", "Mystery", "Oyo"]);
  }

  #[test]
  fn sort_by_area_desc() {
    let fs = features();
    let mut rows = filter_features(&fs, "");
    sort_features(&mut rows, SortKey::Area, SortDir::Desc);
    assert_eq!(names(&rows), ["Oyo", "kano", "Lagos", "Mystery"]);
  }

  #[test]
  fn sort_by_token_count_keeps_ties_in_order() {
    let fs = features();
    let mut rows = filter_features(&fs, "");
    sort_features(&mut rows, SortKey::Parties, SortDir::Desc);
    assert_eq!(names(&rows), ["Lagos", "kano", "Oyo", "Mystery"]);
  }

  #[test]
  fn sort_params_parse() {
    assert_eq!("Tribes".parse::<SortKey>().unwrap(), SortKey::Tribes);
    assert_eq!("desc".parse::<SortDir>().unwrap(), SortDir::Desc);
    assert!("size".parse::<SortKey>().is_err());
  }

  #[test]
  fn zone_stats_group_in_first_seen_order() {
    let stats = zone_stats(&features());
    let zones: Vec<&str> = stats.iter().map(|s| s.zone.as_str()).collect();
    assert_eq!(zones, ["South West", "North West", UNKNOWN_ZONE]);
    assert_eq!(stats[0].state_count, 2.0);
    assert_eq!(stats[0].total_area, 3345.0 + 28454.0);
    assert_eq!(stats[2].total_area, 0.0);
  }

  #[test]
  fn party_stats_count_each_state_once() {
    let stats = party_stats(&features());
    assert_eq!(stats[0].party, "APC");
    assert_eq!(stats[0].state_count, 2.0);
    let pdp = stats.iter().find(|s| s.party == "PDP").unwrap();
    assert_eq!(pdp.state_count, 2.0);
    assert_eq!(stats.iter().map(|s| s.state_count).sum::<f64>(), 6.0);
  }

  #[test]
  fn table_row_defaults() {
    let row = TableRow::from(&features()[3]);
    assert_eq!(row.state, "Mystery");
    assert_eq!(row.zone, "");
    assert_eq!(row.area_km2, 0.0);
  }

  #[test]
  fn tribe_rows_accept_both_key_styles() {
    let mut rows: Vec<TribeStat> = serde_json::from_value(json!([
      { "Ethnic_Group": "Yoruba", "Estimated_Population_Millions": 45.5, "Percentage": 21 },
      { "ethnic_group": "Hausa", "estimated_population_millions": "67.2",
        "main_states": "Kano, Kaduna" }
    ]))
    .unwrap();
    sort_tribes(&mut rows);
    assert_eq!(rows[0].ethnic_group, "Hausa");
    assert_eq!(rows[0].main_states, "Kano, Kaduna");
    assert_eq!(rows[0].percentage, 0.0);
    assert_eq!(rows[1].percentage, 21.0);

    let out = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(out["Ethnic_Group"], "Yoruba");
  }

  #[test]
  fn published_zone_rows_accept_either_zone_key() {
    let rows: Vec<ZoneStat> = serde_json::from_value(json!([
      { "Zone": "North East", "stateCount": 6, "totalArea": 272395 },
      { "zone": "South East", "stateCount": "5" }
    ]))
    .unwrap();
    assert_eq!(rows[0].zone, "North East");
    assert_eq!(rows[1].state_count, 5.0);
    assert_eq!(rows[1].total_area, 0.0);
  }
}
