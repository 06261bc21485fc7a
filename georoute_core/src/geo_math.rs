//! Great-circle math on a spherical Earth.
//!
//! Distances are geometric approximations (haversine on a 6371 km sphere),
//! not network measurements. Paths are interpolated along the great circle
//! with `geo`'s haversine intermediate points.

use geo::{HaversineIntermediate, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fixed Earth radius used for every surface distance, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Central angles closer than this to 0 or π have no unique great circle.
const DEGENERATE_ANGLE_RAD: f64 = 1e-12;

/// A geographic position in decimal degrees.
///
/// Valid domain: lat ∈ [-90, 90], lng ∈ [-180, 180]. Out-of-range values
/// are not rejected; results for them are unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for Point<f64> {
    fn from(p: LatLng) -> Self {
        // geo uses x = longitude, y = latitude
        Point::new(p.lng, p.lat)
    }
}

impl From<Point<f64>> for LatLng {
    fn from(p: Point<f64>) -> Self {
        LatLng::new(p.y(), p.x())
    }
}

/// Central angle between two points, in radians (haversine formulation).
fn central_angle(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    // Rounding can push h marginally past 1 for near-antipodal points
    2.0 * h.sqrt().min(1.0).asin()
}

/// Haversine great-circle distance between two points, in kilometres.
///
/// Pure and symmetric; `surface_distance_km(a, a) == 0.0`.
pub fn surface_distance_km(a: LatLng, b: LatLng) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Waypoints approximating the great-circle arc from `a` to `b`.
///
/// Returns exactly `points` waypoints (at least 2), evenly spaced by arc
/// fraction, with `path[0] == a` and `path[last] == b`. Coincident or
/// antipodal endpoints have no unique arc and yield `[a, b]`.
pub fn geodesic_path(a: LatLng, b: LatLng, points: usize) -> Vec<LatLng> {
    let points = points.max(2);
    let angle = central_angle(a, b);
    if angle < DEGENERATE_ANGLE_RAD || PI - angle < DEGENERATE_ANGLE_RAD {
        return vec![a, b];
    }

    let start: Point<f64> = a.into();
    let end: Point<f64> = b.into();
    let segments = (points - 1) as f64;

    let mut path = Vec::with_capacity(points);
    path.push(a);
    for i in 1..points - 1 {
        let fraction = i as f64 / segments;
        path.push(start.haversine_intermediate(&end, fraction).into());
    }
    path.push(b);
    path
}
