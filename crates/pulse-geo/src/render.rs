//! SVG rendering of the state map and the tile-map view description.

use std::io::Cursor;

use quick_xml::{
  Writer,
  events::{BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;

use crate::{
  error::{Error, Result},
  geojson::Feature,
  projection::{Mercator, Tier, fit_projection},
};

/// Fill for features whose zone is missing or unrecognised, on the SVG map.
pub const UNKNOWN_ZONE_FILL: &str = "#D0D0D0";
/// Same, on the tile map.
pub const UNKNOWN_ZONE_TILE_FILL: &str = "#808080";

const FILL_OPACITY: &str = "0.85";
const STROKE: &str = "#333";
const STROKE_WIDTH: &str = "0.8";

/// The six geopolitical zones and their map colours.
pub fn zone_color(zone: &str) -> Option<&'static str> {
  let color = match zone {
    "North Central" => "#2E8B57",
    "North East" => "#4169E1",
    "North West" => "#DC143C",
    "South East" => "#FF8C00",
    "South South" => "#9932CC",
    "South West" => "#FFD700",
    _ => return None,
  };
  Some(color)
}

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Three decimals, without trailing zeros.
fn coord(v: f64) -> String { format!("{}", (v * 1000.0).round() / 1000.0 + 0.0) }

/// SVG path `d` for a feature, or `None` when it has nothing drawable.
pub fn path_data(feature: &Feature, projection: &Mercator) -> Option<String> {
  let geometry = feature.geometry.as_ref()?;
  let mut d = String::new();

  for ring in geometry.polygons().iter().flatten() {
    let points: Vec<[f64; 2]> = ring
      .iter()
      .map(|p| projection.project(*p))
      .filter(|[x, y]| x.is_finite() && y.is_finite())
      .collect();
    if points.len() < 2 {
      continue;
    }
    for (i, [x, y]) in points.iter().enumerate() {
      d.push(if i == 0 { 'M' } else { 'L' });
      d.push_str(&coord(*x));
      d.push(',');
      d.push_str(&coord(*y));
    }
    d.push('Z');
  }

  (!d.is_empty()).then_some(d)
}

/// Hover text: name, zone, parties, tribes and area, one per line.
pub fn tooltip(feature: &Feature) -> String {
  let or_na = |v: Option<String>| v.unwrap_or_else(|| "N/A".to_owned());
  format!(
    "{}\nZone: {}\nParties: {}\nTribes: {}\nArea: {} km²",
    feature.name().unwrap_or_else(|| "Unknown".to_owned()),
    feature.zone().unwrap_or("Unknown"),
    or_na(feature.parties()),
    or_na(feature.tribes()),
    or_na(feature.text("area_km2")),
  )
}

// ─── SVG ─────────────────────────────────────────────────────────────────────

type SvgWriter = Writer<Cursor<Vec<u8>>>;

fn emit(w: &mut SvgWriter, event: Event<'_>) -> Result<()> {
  w.write_event(event).map_err(|e| Error::Render(e.to_string()))
}

/// Render the whole map. Features that cannot be drawn are skipped; with no
/// drawable features the result is an empty map on the fixed view.
pub fn render_svg(features: &[Feature], width: f64, height: f64) -> Result<String> {
  let fit = fit_projection(features, width, height);
  let mut w = Writer::new(Cursor::new(Vec::new()));

  let view_box = format!("0 0 {} {}", coord(width), coord(height));
  let height_attr = coord(height);
  let mut svg = BytesStart::new("svg");
  svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
  svg.push_attribute(("width", "100%"));
  svg.push_attribute(("height", height_attr.as_str()));
  svg.push_attribute(("viewBox", view_box.as_str()));
  svg.push_attribute(("preserveAspectRatio", "xMidYMid meet"));
  svg.push_attribute(("data-projection", fit.tier.to_string().as_str()));
  emit(&mut w, Event::Start(svg))?;

  for feature in features {
    let Some(d) = path_data(feature, &fit.projection) else { continue };
    let fill = feature.zone().and_then(zone_color).unwrap_or(UNKNOWN_ZONE_FILL);

    let mut path = BytesStart::new("path");
    path.push_attribute(("d", d.as_str()));
    path.push_attribute(("fill", fill));
    path.push_attribute(("fill-opacity", FILL_OPACITY));
    path.push_attribute(("stroke", STROKE));
    path.push_attribute(("stroke-width", STROKE_WIDTH));
    path.push_attribute(("vector-effect", "non-scaling-stroke"));
    emit(&mut w, Event::Start(path))?;

    emit(&mut w, Event::Start(BytesStart::new("title")))?;
    emit(&mut w, Event::Text(BytesText::new(&tooltip(feature))))?;
    emit(&mut w, Event::End(BytesEnd::new("title")))?;
    emit(&mut w, Event::End(BytesEnd::new("path")))?;
  }

  emit(&mut w, Event::End(BytesEnd::new("svg")))?;
  String::from_utf8(w.into_inner().into_inner()).map_err(|e| Error::Render(e.to_string()))
}

// ─── Tile map view ───────────────────────────────────────────────────────────

/// `[[south, west], [north, east]]` used when there is no geometry.
pub const FALLBACK_BOUNDS: [[f64; 2]; 2] = [[4.0, 3.0], [14.0, 14.0]];
/// `[latitude, longitude]`.
pub const DEFAULT_CENTER: [f64; 2] = [9.082, 8.6753];
pub const DEFAULT_ZOOM: u8 = 6;

const FIT_PADDING_PX: u32 = 16;
const MAX_BOUNDS_PAD: f64 = 0.05;

/// Per-feature styling for the tile map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
  pub name:         String,
  pub zone:         String,
  pub fill_color:   &'static str,
  pub color:        &'static str,
  pub weight:       f64,
  pub fill_opacity: f64,
  pub tooltip:      String,
}

impl From<&Feature> for FeatureStyle {
  fn from(feature: &Feature) -> Self {
    let name = feature
      .name()
      .or_else(|| feature.text("State"))
      .unwrap_or_else(|| "Unknown".to_owned());
    let zone = feature.zone().unwrap_or("Unknown").to_owned();
    Self {
      tooltip: format!("{name} - {zone}"),
      fill_color: feature.zone().and_then(zone_color).unwrap_or(UNKNOWN_ZONE_TILE_FILL),
      color: STROKE,
      weight: 1.5,
      fill_opacity: 0.7,
      name,
      zone,
    }
  }
}

/// Everything a tile-map client needs to frame and style the states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
  /// `[[south, west], [north, east]]`.
  pub bounds:      [[f64; 2]; 2],
  /// `bounds` grown by 5% on each side; panning stops here.
  pub max_bounds:  [[f64; 2]; 2],
  pub center:      [f64; 2],
  pub zoom:        u8,
  pub padding:     u32,
  pub projection:  Tier,
  pub features:    Vec<FeatureStyle>,
}

/// Lat/lng bounds of all geometry, or [`FALLBACK_BOUNDS`].
pub fn geo_bounds(features: &[Feature]) -> [[f64; 2]; 2] {
  let mut positions = features
    .iter()
    .filter_map(|f| f.geometry.as_ref())
    .flat_map(|g| g.positions());

  let Some(&[lon, lat]) = positions.next() else { return FALLBACK_BOUNDS };
  positions.fold([[lat, lon], [lat, lon]], |[sw, ne], &[lon, lat]| {
    [[sw[0].min(lat), sw[1].min(lon)], [ne[0].max(lat), ne[1].max(lon)]]
  })
}

fn pad([sw, ne]: [[f64; 2]; 2], ratio: f64) -> [[f64; 2]; 2] {
  let dlat = (ne[0] - sw[0]).abs() * ratio;
  let dlng = (ne[1] - sw[1]).abs() * ratio;
  [[sw[0] - dlat, sw[1] - dlng], [ne[0] + dlat, ne[1] + dlng]]
}

impl MapView {
  /// `width` and `height` are the canvas size used to report which
  /// projection tier a static render of the same features would use.
  pub fn new(features: &[Feature], width: f64, height: f64) -> Self {
    let bounds = geo_bounds(features);
    Self {
      bounds,
      max_bounds: pad(bounds, MAX_BOUNDS_PAD),
      center: DEFAULT_CENTER,
      zoom: DEFAULT_ZOOM,
      padding: FIT_PADDING_PX,
      projection: fit_projection(features, width, height).tier,
      features: features.iter().map(FeatureStyle::from).collect(),
    }
  }
}
