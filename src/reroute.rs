//! Reroute gating: cooldown plus in-flight guard.
//!
//! Deviation signals can arrive every sample while the vehicle is off
//! route; this policy turns them into at most one reroute request per
//! cooldown window, and never issues a second request while the routing
//! service is still working on the first.

use crate::deviation::DeviationState;

/// Minimum elapsed time between two permitted reroutes.
pub const REROUTE_COOLDOWN_MS: i64 = 5_000;

/// Whether a permitted reroute ultimately produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerouteOutcome {
    Success,
    Failure,
}

/// Decision for one deviation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerouteDecision {
    /// Request a new route now.
    Request,
    /// A request is already in flight.
    SuppressedInFlight,
    /// The cooldown since the last reroute has not elapsed.
    SuppressedCooldown,
}

/// Gate between deviation detection and the external routing service.
///
/// `last_reroute_timestamp_ms` lives in `DeviationState` so it survives
/// checkpointing together with the breach counter.
#[derive(Debug, Clone, Default)]
pub struct ReroutePolicy {
    in_flight: bool,
}

impl ReroutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Decides whether a deviation signal may become a reroute request.
    ///
    /// On permit, marks the request in flight and stamps the cooldown;
    /// the caller must eventually call `complete` (or `cancel`).
    pub fn on_deviation(&mut self, state: &mut DeviationState, now_ms: i64) -> RerouteDecision {
        if self.in_flight {
            return RerouteDecision::SuppressedInFlight;
        }
        if let Some(last) = state.last_reroute_timestamp_ms {
            if now_ms - last < REROUTE_COOLDOWN_MS {
                return RerouteDecision::SuppressedCooldown;
            }
        }
        self.in_flight = true;
        state.last_reroute_timestamp_ms = Some(now_ms);
        RerouteDecision::Request
    }

    /// Clears the in-flight flag once the routing service responded.
    ///
    /// Cleared on failure too, so a later deviation can retry naturally;
    /// there is no automatic retry.
    pub fn complete(&mut self, outcome: RerouteOutcome) -> RerouteOutcome {
        self.in_flight = false;
        outcome
    }

    /// Drops any in-flight request, e.g. when the trip stops.
    pub fn cancel(&mut self) {
        self.in_flight = false;
    }
}
