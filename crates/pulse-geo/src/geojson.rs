//! The subset of GeoJSON the state-boundary file uses.
//!
//! Parsing is tolerant: a document without `features` is an empty
//! collection, and a feature whose geometry cannot be read keeps its
//! properties with `geometry: None` so the statistics and the table still
//! include it.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;

/// `[longitude, latitude]` in degrees.
pub type Position = [f64; 2];
pub type Ring = Vec<Position>;
/// Exterior ring followed by any holes.
pub type Polygon = Vec<Ring>;

// ─── Geometry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
  Polygon(Polygon),
  MultiPolygon(Vec<Polygon>),
}

impl Geometry {
  /// Read a geometry object. Unsupported types and malformed coordinates
  /// yield `None`.
  pub fn from_value(value: &Value) -> Option<Self> {
    let coordinates = value.get("coordinates")?;
    match value.get("type")?.as_str()? {
      "Polygon" => polygon(coordinates).map(Geometry::Polygon),
      "MultiPolygon" => coordinates
        .as_array()?
        .iter()
        .map(polygon)
        .collect::<Option<Vec<_>>>()
        .map(Geometry::MultiPolygon),
      _ => None,
    }
  }

  pub fn polygons(&self) -> &[Polygon] {
    match self {
      Geometry::Polygon(p) => std::slice::from_ref(p),
      Geometry::MultiPolygon(ps) => ps,
    }
  }

  pub fn positions(&self) -> impl Iterator<Item = &Position> {
    self.polygons().iter().flatten().flatten()
  }
}

fn polygon(value: &Value) -> Option<Polygon> {
  value
    .as_array()?
    .iter()
    .map(|ring| -> Option<Ring> { ring.as_array()?.iter().map(position).collect() })
    .collect()
}

/// A position may carry an altitude; only the first two values are kept.
fn position(value: &Value) -> Option<Position> {
  let coords = value.as_array()?;
  let lon = coords.first()?.as_f64()?;
  let lat = coords.get(1)?.as_f64()?;
  (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
}

// ─── Feature ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
  pub properties: Map<String, Value>,
  pub geometry:   Option<Geometry>,
}

impl Feature {
  pub fn from_value(value: &Value) -> Self {
    let mut properties = value
      .get("properties")
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default();

    // Some exports spell the zone key in lowercase.
    if !properties.contains_key("Zone")
      && let Some(zone) = properties.get("zone").cloned()
    {
      properties.insert("Zone".to_owned(), zone);
    }

    let geometry = value.get("geometry").and_then(Geometry::from_value);
    Self { properties, geometry }
  }

  /// A property rendered as display text. Empty strings and non-scalar
  /// values count as missing.
  pub fn text(&self, key: &str) -> Option<String> {
    match self.properties.get(key)? {
      Value::String(s) if !s.is_empty() => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  /// `shapeName`.
  pub fn name(&self) -> Option<String> { self.text("shapeName") }

  pub fn zone(&self) -> Option<&str> {
    self
      .properties
      .get("Zone")
      .and_then(Value::as_str)
      .filter(|z| !z.is_empty())
  }

  /// `Typical_Parties`, a comma-separated list.
  pub fn parties(&self) -> Option<String> { self.text("Typical_Parties") }

  /// `Major_Tribes`, a comma-separated list.
  pub fn tribes(&self) -> Option<String> { self.text("Major_Tribes") }

  /// `area_km2` as a number; missing or unparsable values are 0.
  pub fn area_km2(&self) -> f64 {
    let area = match self.properties.get("area_km2") {
      Some(Value::Number(n)) => n.as_f64(),
      Some(Value::String(s)) => s.trim().parse().ok(),
      _ => None,
    };
    area.filter(|a: &f64| a.is_finite()).unwrap_or(0.0)
  }
}

// ─── Collection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
  pub features: Vec<Feature>,
}

impl FeatureCollection {
  /// Parse a GeoJSON document. Only text that is not JSON is an error.
  pub fn from_json(text: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(text)?;
    Ok(Self::from_value(&value))
  }

  pub fn from_value(value: &Value) -> Self {
    let features: Vec<Feature> = value
      .get("features")
      .and_then(Value::as_array)
      .map(|fs| fs.iter().map(Feature::from_value).collect())
      .unwrap_or_default();

    let unreadable = features.iter().filter(|f| f.geometry.is_none()).count();
    if unreadable > 0 {
      warn!(unreadable, total = features.len(), "features without usable geometry");
    }
    Self { features }
  }
}

/// Split a comma-separated property into trimmed, non-empty tokens.
pub fn tokens(list: &str) -> impl Iterator<Item = &str> {
  list.split(',').map(str::trim).filter(|t| !t.is_empty())
}
