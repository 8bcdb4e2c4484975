//! Spherical Mercator with the same conventions as d3's `geoMercator`, and
//! the cascade that fits it to a canvas.
//!
//! The cascade never fails: each tier is checked and the next one is tried
//! when the result is unusable, ending in a fixed view of Nigeria.

use std::f64::consts::{FRAC_PI_4, TAU};

use serde::Serialize;
use tracing::{debug, warn};

use crate::geojson::{Feature, Position};

/// Latitudes are clamped to this many degrees before projecting.
const MAX_LATITUDE: f64 = 85.0;

/// A fitted map narrower or shorter than this is treated as degenerate.
const MIN_FIT_SPAN: f64 = 10.0;

/// Scale of the fixed view on an 800px-wide canvas.
const FALLBACK_SCALE_AT_800: f64 = 1400.0;

/// `[longitude, latitude]` the fixed view is centred on.
pub const NIGERIA_CENTER: Position = [8.6753, 9.082];

// ─── Projection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mercator {
  pub scale:     f64,
  /// Pixel position of `center`.
  pub translate: [f64; 2],
  /// `[longitude, latitude]` mapped to `translate`.
  pub center:    Position,
}

impl Default for Mercator {
  fn default() -> Self {
    Self {
      scale:     961.0 / TAU,
      translate: [480.0, 250.0],
      center:    [0.0, 0.0],
    }
  }
}

fn raw([lon, lat]: Position) -> [f64; 2] {
  let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
  [lon.to_radians(), (FRAC_PI_4 + lat / 2.0).tan().ln()]
}

impl Mercator {
  pub fn project(&self, position: Position) -> [f64; 2] {
    let [x, y] = raw(position);
    let [cx, cy] = raw(self.center);
    [
      self.translate[0] + self.scale * (x - cx),
      self.translate[1] - self.scale * (y - cy),
    ]
  }

  fn is_finite(&self) -> bool {
    self.scale.is_finite()
      && self.scale > 0.0
      && self.translate.iter().all(|t| t.is_finite())
  }

  /// The fixed view: Nigeria in the middle of the canvas.
  pub fn fallback(width: f64, height: f64) -> Self {
    Self {
      scale:     FALLBACK_SCALE_AT_800 * (width / 800.0),
      translate: [width / 2.0, height / 2.0],
      center:    NIGERIA_CENTER,
    }
  }

  fn at_origin(scale: f64) -> Self {
    Self { scale, translate: [0.0, 0.0], center: [0.0, 0.0] }
  }
}

// ─── Bounds ──────────────────────────────────────────────────────────────────

/// Axis-aligned box in projected pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
  pub min: [f64; 2],
  pub max: [f64; 2],
}

impl Bounds {
  pub fn width(&self) -> f64 { self.max[0] - self.min[0] }

  pub fn height(&self) -> f64 { self.max[1] - self.min[1] }

  fn is_usable(&self) -> bool {
    let (w, h) = (self.width(), self.height());
    w.is_finite() && h.is_finite() && w >= MIN_FIT_SPAN && h >= MIN_FIT_SPAN
  }
}

/// Projected bounds of every position of every feature; `None` when there
/// is no geometry at all.
pub fn projected_bounds(features: &[Feature], projection: &Mercator) -> Option<Bounds> {
  let mut points = features
    .iter()
    .filter_map(|f| f.geometry.as_ref())
    .flat_map(|g| g.positions())
    .map(|p| projection.project(*p));

  let first = points.next()?;
  let bounds = points.fold(Bounds { min: first, max: first }, |b, [x, y]| Bounds {
    min: [b.min[0].min(x), b.min[1].min(y)],
    max: [b.max[0].max(x), b.max[1].max(y)],
  });
  Some(bounds)
}

// ─── Fit cascade ─────────────────────────────────────────────────────────────

/// Which step of the cascade produced the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
  /// Fitted to the full canvas.
  Extent,
  /// Scaled from a unit-scale bounding box.
  Manual,
  /// The fixed view of Nigeria.
  Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fit {
  pub projection: Mercator,
  pub tier:       Tier,
}

/// Fit a projection so `features` fill a `width` × `height` canvas.
pub fn fit_projection(features: &[Feature], width: f64, height: f64) -> Fit {
  let canvas_ok = width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0;
  let has_geometry = features.iter().any(|f| f.geometry.is_some());
  if !canvas_ok || !has_geometry {
    debug!(width, height, has_geometry, "using fixed map view");
    return Fit { projection: Mercator::fallback(width, height), tier: Tier::Fallback };
  }

  if let Some(projection) = fit_extent(features, width, height) {
    debug!(scale = projection.scale, "projection fitted to extent");
    return Fit { projection, tier: Tier::Extent };
  }
  warn!(width, height, "extent fit degenerate, trying manual bounds");

  if let Some(projection) = fit_manual(features, width, height) {
    return Fit { projection, tier: Tier::Manual };
  }
  warn!(width, height, "manual fit failed, using fixed map view");

  Fit { projection: Mercator::fallback(width, height), tier: Tier::Fallback }
}

/// Scale and centre a projection from `bounds` taken at scale `base`.
fn centred(bounds: Bounds, base: f64, width: f64, height: f64) -> Mercator {
  let k = (width / bounds.width()).min(height / bounds.height());
  Mercator {
    scale:     base * k,
    translate: [
      (width - k * (bounds.max[0] + bounds.min[0])) / 2.0,
      (height - k * (bounds.max[1] + bounds.min[1])) / 2.0,
    ],
    center:    [0.0, 0.0],
  }
}

fn fit_extent(features: &[Feature], width: f64, height: f64) -> Option<Mercator> {
  const BASE: f64 = 150.0;
  let bounds = projected_bounds(features, &Mercator::at_origin(BASE))?;
  let projection = centred(bounds, BASE, width, height);
  if !projection.is_finite() {
    return None;
  }
  projected_bounds(features, &projection)
    .filter(Bounds::is_usable)
    .map(|_| projection)
}

fn fit_manual(features: &[Feature], width: f64, height: f64) -> Option<Mercator> {
  let bounds = projected_bounds(features, &Mercator::at_origin(1.0))?;
  Some(centred(bounds, 1.0, width, height)).filter(Mercator::is_finite)
}
