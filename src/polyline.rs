//! Planned-route polyline.
//!
//! The route arrives already computed from the external routing service
//! as a decoded coordinate sequence. Encoding/decoding of the compact
//! wire format happens at the API boundary, not in the engine: the
//! engine only ever matches positions against decoded points.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// A planned route as an ordered sequence of coordinates.
///
/// Immutable once assigned to an active trip; a reroute replaces the
/// whole polyline rather than patching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePolyline {
    points: Vec<LatLng>,
}

impl RoutePolyline {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn into_points(self) -> Vec<LatLng> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
