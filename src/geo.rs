//! Great-circle and route-matching geometry.
//!
//! Distances come in two flavors: point-to-point haversine for
//! accumulation and arrival checks, and point-to-polyline for deviation
//! detection. Polyline matching projects onto each segment in a local
//! planar frame, which is accurate at the scales that matter here
//! (tens to hundreds of meters off a road).

use crate::errors::LocationUnavailable;
use crate::polyline::RoutePolyline;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A validated geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    /// Creates a coordinate, rejecting NaN and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationUnavailable> {
        let candidate = Self {
            latitude,
            longitude,
        };
        if candidate.is_valid() {
            Ok(candidate)
        } else {
            Err(LocationUnavailable::InvalidCoordinates)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle (haversine) distance between two points, in meters.
pub fn distance(a: LatLng, b: LatLng) -> Result<f64, LocationUnavailable> {
    if !a.is_valid() || !b.is_valid() {
        return Err(LocationUnavailable::InvalidCoordinates);
    }
    Ok(haversine_m(a, b))
}

fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Minimum distance in meters from `point` to the route polyline.
///
/// Projects the point onto each consecutive segment; when the projection
/// falls outside the segment bounds the nearer endpoint is used instead.
/// An empty polyline has no geometry to compare against and yields
/// `f64::INFINITY`; a single point degenerates to point-to-point distance.
pub fn distance_to_polyline(point: LatLng, route: &RoutePolyline) -> f64 {
    let points = route.points();
    match points.len() {
        0 => f64::INFINITY,
        1 => haversine_m(point, points[0]),
        _ => points
            .windows(2)
            .map(|pair| point_to_segment_m(point, pair[0], pair[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from a point to a great-circle segment, approximated in a
/// local planar frame centered on the point.
fn point_to_segment_m(point: LatLng, start: LatLng, end: LatLng) -> f64 {
    let (ax, ay) = to_local_m(point, start);
    let (bx, by) = to_local_m(point, end);

    let seg_x = bx - ax;
    let seg_y = by - ay;
    let seg_len_sq = seg_x * seg_x + seg_y * seg_y;

    if seg_len_sq == 0.0 {
        // Degenerate segment, both endpoints coincide.
        return (ax * ax + ay * ay).sqrt();
    }

    // Projection parameter of the origin (the point) onto the segment,
    // clamped to the segment bounds.
    let t = (-(ax * seg_x + ay * seg_y) / seg_len_sq).clamp(0.0, 1.0);
    let closest_x = ax + t * seg_x;
    let closest_y = ay + t * seg_y;

    (closest_x * closest_x + closest_y * closest_y).sqrt()
}

/// Planar offset of `other` relative to `origin`, in meters.
fn to_local_m(origin: LatLng, other: LatLng) -> (f64, f64) {
    let x = (other.longitude - origin.longitude).to_radians()
        * EARTH_RADIUS_M
        * origin.latitude.to_radians().cos();
    let y = (other.latitude - origin.latitude).to_radians() * EARTH_RADIUS_M;
    (x, y)
}
