//! Off-route detection with speed-scaled tolerance and debouncing.
//!
//! A single off-route sample is GPS noise until proven otherwise: the
//! detector requires consecutive breaches before reporting a deviation,
//! and widens its tolerance with speed since fixes scatter more at
//! highway pace.

use serde::{Deserialize, Serialize};

use crate::geo::{self, LatLng};
use crate::polyline::RoutePolyline;

/// Off-route tolerance at standstill, in meters.
pub const BASE_THRESHOLD_M: f64 = 30.0;

/// Speed at which the tolerance reaches its 2x cap, in km/h.
pub const THRESHOLD_SCALE_SPEED_KMH: f64 = 60.0;

/// Consecutive breaches required before reporting a deviation.
pub const REQUIRED_CONSECUTIVE_BREACHES: u32 = 2;

/// Detection counters for the active trip.
///
/// Owned by `TripLifecycle` and passed by reference into the detector;
/// reset whenever the trip leaves `tracking`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationState {
    pub consecutive_off_route: u32,
    pub last_reroute_timestamp_ms: Option<i64>,
}

impl DeviationState {
    pub fn reset_counter(&mut self) {
        self.consecutive_off_route = 0;
    }
}

/// Result of assessing one location sample against the planned route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviationVerdict {
    /// Within tolerance; the breach counter was reset.
    OnRoute { distance_from_route_m: f64 },
    /// Breached the threshold, but not often enough in a row yet.
    OffRoutePending { distance_from_route_m: f64 },
    /// Confirmed off-route.
    Deviated { distance_from_route_m: f64 },
}

impl DeviationVerdict {
    pub fn is_deviated(&self) -> bool {
        matches!(self, DeviationVerdict::Deviated { .. })
    }
}

/// Off-route tolerance for the given speed: `base * min(1 + v/60, 2)`.
pub fn threshold_for_speed_m(speed_kmh: f64) -> f64 {
    let speed = speed_kmh.max(0.0);
    BASE_THRESHOLD_M * (1.0 + speed / THRESHOLD_SCALE_SPEED_KMH).min(2.0)
}

/// Assesses one sample, updating the breach counter in `state`.
pub fn assess(
    state: &mut DeviationState,
    position: LatLng,
    route: &RoutePolyline,
    speed_kmh: f64,
) -> DeviationVerdict {
    let distance_from_route_m = geo::distance_to_polyline(position, route);
    let threshold = threshold_for_speed_m(speed_kmh);

    if distance_from_route_m <= threshold {
        state.reset_counter();
        return DeviationVerdict::OnRoute {
            distance_from_route_m,
        };
    }

    state.consecutive_off_route = state.consecutive_off_route.saturating_add(1);
    if state.consecutive_off_route >= REQUIRED_CONSECUTIVE_BREACHES {
        DeviationVerdict::Deviated {
            distance_from_route_m,
        }
    } else {
        DeviationVerdict::OffRoutePending {
            distance_from_route_m,
        }
    }
}
