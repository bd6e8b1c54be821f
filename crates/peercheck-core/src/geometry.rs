//! Geodesic distance primitives and the shared proximity threshold.

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::models::Point;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Proximity threshold for every "touches" / "near" check: 3 ft in meters.
pub const THRESHOLD_M: f64 = 3.0 / 3.28084;

/// Great-circle distance in meters between two `(lat, lon)` pairs in decimal
/// degrees.
#[cfg_attr(feature = "python", pyfunction)]
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Haversine distance between two points.
pub fn distance(p1: Point, p2: Point) -> f64 {
    haversine(p1.lat, p1.lon, p2.lat, p2.lon)
}

/// Distance in meters from `p` to the segment `a`-`b`.
///
/// Uses an equirectangular projection around the segment's mean latitude,
/// which is accurate well below the proximity threshold. A degenerate segment
/// falls back to point distance.
pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let kx = mean_lat.cos() * EARTH_RADIUS_M;
    let ky = EARTH_RADIUS_M;

    let bx = (b.lon - a.lon).to_radians() * kx;
    let by = (b.lat - a.lat).to_radians() * ky;
    let px = (p.lon - a.lon).to_radians() * kx;
    let py = (p.lat - a.lat).to_radians() * ky;

    let len_sq = bx * bx + by * by;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = ((px * bx + py * by) / len_sq).clamp(0.0, 1.0);
    let dx = px - t * bx;
    let dy = py - t * by;
    (dx * dx + dy * dy).sqrt()
}

/// Minimum distance from `p` to a polyline. A single vertex is treated as a
/// point; an empty polyline is infinitely far away.
pub fn distance_to_polyline(p: Point, vertices: &[Point]) -> f64 {
    match vertices {
        [] => f64::INFINITY,
        [only] => distance(p, *only),
        _ => vertices
            .windows(2)
            .map(|w| point_to_segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// `d <= THRESHOLD_M`. NaN never satisfies the threshold.
pub fn within_threshold(d: f64) -> bool {
    d <= THRESHOLD_M
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "point_to_segment_distance")]
pub fn py_point_to_segment_distance(
    p: (f64, f64),
    a: (f64, f64),
    b: (f64, f64),
) -> f64 {
    point_to_segment_distance(
        Point::new(p.0, p.1),
        Point::new(a.0, a.1),
        Point::new(b.0, b.1),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
