//! Typed events exposed to the presentation layer.
//!
//! The engine never renders anything itself; every user-visible moment
//! is emitted as a `TripEvent` and returned from the lifecycle operation
//! that produced it.

use crate::errors::SyncError;
use crate::trip::TripStatus;

/// One-shot proximity tiers on approach to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityTier {
    Within500M,
    Within200M,
    Within50M,
}

impl ProximityTier {
    pub fn meters(&self) -> f64 {
        match self {
            ProximityTier::Within500M => 500.0,
            ProximityTier::Within200M => 200.0,
            ProximityTier::Within50M => 50.0,
        }
    }
}

/// Events emitted by the trip engine, in the order they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum TripEvent {
    /// Position confirmed off-route after debouncing.
    DeviationDetected { distance_from_route_m: f64 },
    /// The reroute policy permitted a reroute; the external routing
    /// service should compute a new route and report back through
    /// `apply_reroute_result`.
    RerouteRequested { reason: String },
    /// The routing service failed; no automatic retry.
    RerouteFailed,
    /// First time the distance to destination dropped below a tier.
    ProximityTierCrossed(ProximityTier),
    /// Terminal arrival tier reached; tracking auto-stopped.
    Arrived,
    LowFuel { level_percent: f64 },
    CriticalFuel { level_percent: f64 },
    TripStateChanged(TripStatus),
    /// Distance sync gave up (retries exhausted or permanent failure).
    SyncFailed { error: SyncError },
    /// An unexpected internal error forced a degraded stop.
    RecoverableError { message: String },
}
