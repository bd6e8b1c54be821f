//! Shared typed models for the network snapshot consumed by the survey and
//! walker passes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::colors::{token_to_color, FiberColor};
use crate::geometry::{distance, distance_to_polyline};

/// Decimal places kept on every coordinate (1e-6 degrees).
pub const COORD_SCALE: f64 = 1_000_000.0;

/// Round a coordinate component to the shared 1e-6 degree grid.
pub fn round_coord(value: f64) -> f64 {
    (value * COORD_SCALE).round() / COORD_SCALE
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A geographic coordinate in decimal degrees.
///
/// Construction always rounds to the 1e-6 degree grid, so two points built
/// from the same physical location compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: round_coord(lat),
            lon: round_coord(lon),
        }
    }

    /// Build a point from a GeoJSON `[lon, lat, ...]` position.
    pub fn from_lon_lat(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Network features
// ---------------------------------------------------------------------------

/// A named trunk or branch distribution cable (e.g. `04.AC01.HAR.DF1.24B`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionLine {
    pub id: String,
    pub segments: Vec<Vec<Point>>,
}

impl DistributionLine {
    /// True when `point` lies within `threshold_m` of any segment.
    pub fn passes_near(&self, point: Point, threshold_m: f64) -> bool {
        self.segments
            .iter()
            .any(|seg| distance_to_polyline(point, seg) <= threshold_m)
    }

    /// True when any vertex of any segment lies within `threshold_m`.
    pub fn has_vertex_near(&self, point: Point, threshold_m: f64) -> bool {
        self.segments
            .iter()
            .flatten()
            .any(|v| distance(*v, point) <= threshold_m)
    }

    /// True when the first or last vertex of any segment lies within
    /// `threshold_m`.
    pub fn has_endpoint_near(&self, point: Point, threshold_m: f64) -> bool {
        self.segments.iter().any(|seg| {
            let ends = [seg.first(), seg.last()];
            ends.into_iter()
                .flatten()
                .any(|v| distance(*v, point) <= threshold_m)
        })
    }
}

/// A T3 root vault from which trunk walks begin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vault {
    pub id: String,
    pub point: Point,
}

/// Raw, unparsed NAP descriptor fields as they arrive from the source layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NapProperties {
    pub fiber_count: Option<String>,
    pub loose_tubes: Option<String>,
    pub splice_colors: Option<String>,
    pub tie_points: Option<String>,
}

/// A network access point located on a distribution line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Nap {
    pub id: String,
    pub point: Point,
    pub props: NapProperties,
}

/// One polyline part of a fiber drop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DropSegment {
    pub id: String,
    pub vertices: Vec<Point>,
    pub raw_color: String,
    pub color: Option<FiberColor>,
}

impl DropSegment {
    pub fn new(id: impl Into<String>, vertices: Vec<Point>, raw_color: impl Into<String>) -> Self {
        let raw_color = raw_color.into().trim().to_string();
        let color = token_to_color(&raw_color);
        Self {
            id: id.into(),
            vertices,
            raw_color,
            color,
        }
    }

    /// Canonical color name, or the raw text when it did not resolve.
    pub fn color_label(&self) -> String {
        match self.color {
            Some(c) => c.name().to_string(),
            None => self.raw_color.clone(),
        }
    }
}

/// A subscriber endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceLocation {
    pub id: String,
    pub point: Point,
    pub splice_raw: String,
    pub loose_tube: String,
}

/// A drop whose endpoint touches a point of interest.
#[derive(Clone, Debug)]
pub struct DropTouch<'a> {
    pub drop: &'a DropSegment,
    pub far_end: Point,
    pub distance_m: f64,
}

// ---------------------------------------------------------------------------
// NetworkSnapshot
// ---------------------------------------------------------------------------

/// Immutable in-memory snapshot of every feature layer used by one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NetworkSnapshot {
    pub distributions: BTreeMap<String, DistributionLine>,
    pub vaults: Vec<Vault>,
    pub naps: Vec<Nap>,
    pub drops: Vec<DropSegment>,
    pub service_locations: Vec<ServiceLocation>,
}

impl NetworkSnapshot {
    /// Sort every point layer by id (stable) so iteration order is
    /// reproducible regardless of source file order.
    pub fn normalize(mut self) -> Self {
        self.vaults.sort_by(|a, b| a.id.cmp(&b.id));
        self.naps.sort_by(|a, b| a.id.cmp(&b.id));
        self.drops.sort_by(|a, b| a.id.cmp(&b.id));
        self.service_locations.sort_by(|a, b| a.id.cmp(&b.id));
        self
    }

    /// Append segments to a distribution line, creating it on first sight.
    pub fn add_distribution_segment(&mut self, id: &str, segment: Vec<Point>) {
        self.distributions
            .entry(id.to_string())
            .or_insert_with(|| DistributionLine {
                id: id.to_string(),
                segments: Vec::new(),
            })
            .segments
            .push(segment);
    }

    pub fn distribution(&self, id: &str) -> Option<&DistributionLine> {
        self.distributions.get(id)
    }

    /// Drops with an endpoint within `threshold_m` of `point`, in drop order.
    pub fn drops_touching(&self, point: Point, threshold_m: f64) -> Vec<DropTouch<'_>> {
        let mut touches = Vec::new();
        for drop in &self.drops {
            let (Some(first), Some(last)) = (drop.vertices.first(), drop.vertices.last()) else {
                continue;
            };
            let d_start = distance(point, *first);
            let d_end = distance(point, *last);
            let at_start = d_start <= threshold_m;
            let at_end = d_end <= threshold_m;
            if !(at_start || at_end) {
                continue;
            }
            let far_end = if at_start { *last } else { *first };
            touches.push(DropTouch {
                drop,
                far_end,
                distance_m: d_start.min(d_end),
            });
        }
        touches
    }

    /// First service location within `threshold_m` of `point`.
    pub fn service_location_near(&self, point: Point, threshold_m: f64) -> Option<&ServiceLocation> {
        self.service_locations
            .iter()
            .find(|sl| distance(sl.point, point) <= threshold_m)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
