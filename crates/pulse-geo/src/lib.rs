//! Geographic rendering for the Snapstats map.
//!
//! Parses the state-boundary GeoJSON, fits a Mercator projection to it
//! through a three-tier cascade that always produces a usable map, renders
//! SVG paths coloured by geopolitical zone, and computes the zone, party and
//! tribe statistics shown next to the map.

pub mod error;
pub mod geojson;
pub mod projection;
pub mod render;
pub mod stats;

pub use error::{Error, Result};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use projection::{Fit, Mercator, Tier, fit_projection};
pub use render::{MapView, path_data, render_svg, zone_color};
