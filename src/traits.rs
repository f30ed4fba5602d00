//! Seams for the engine's external collaborators.
//!
//! These are intentionally minimal: the surrounding application owns the
//! real location stack, fuel-accounting backend, and persistence schema,
//! and implements these traits over them. Tests implement them with
//! in-process fakes.

use serde::{Deserialize, Serialize};

use crate::deviation::DeviationState;
use crate::arrival::ProximityLatches;
use crate::errors::{LocationUnavailable, StoreError, SyncError};
use crate::fuel::Motor;
use crate::polyline::RoutePolyline;
use crate::trip::{LocationSample, Trip, TripSummary};

/// Injectable time source so cooldowns, backoff, and tick scheduling are
/// deterministic under test.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Pull-based access to the current position, used only when starting a
/// trip. Ongoing samples arrive push-based via `on_location_sample`.
pub trait LocationProvider {
    fn current_position(&mut self) -> Result<LocationSample, LocationUnavailable>;
}

/// Authoritative result of a distance submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceSyncReport {
    #[serde(rename = "actualDistanceTraveled")]
    pub actual_distance_traveled_km: f64,
    pub fuel_used_percent: f64,
    pub new_fuel_level_percent: f64,
    pub low_fuel_warning: bool,
    pub drivable_distance_km: f64,
}

/// Outcome of a distance submission: applied, or skipped by the backend
/// because the delta was below its accounting threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceSyncOutcome {
    Applied(DistanceSyncReport),
    Skipped { reason: String },
}

/// Remote fuel/distance-accounting endpoint.
///
/// The backend owns the authoritative consumption model (it may apply
/// nonlinear curves); the engine falls back to a local linear
/// approximation when a call fails.
pub trait FuelAccountingService {
    /// Submits cumulative distance traveled since trip start.
    fn sync_distance(
        &self,
        vehicle_id: &str,
        cumulative_distance_km: f64,
        last_synced_distance_km: f64,
    ) -> Result<DistanceSyncOutcome, SyncError>;

    /// Computes the fuel level after driving `incremental_distance_km`.
    fn fuel_after_distance(
        &self,
        motor: &Motor,
        incremental_distance_km: f64,
    ) -> Result<f64, SyncError>;
}

/// Everything needed to resume a tracking trip after a crash or
/// background suspension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCheckpoint {
    pub trip: Trip,
    pub route: Option<RoutePolyline>,
    pub deviation: DeviationState,
    pub latches: ProximityLatches,
    pub last_accepted_sample: Option<LocationSample>,
}

/// Trip/vehicle persistence store.
///
/// The engine reads a `Motor` snapshot and proposes fuel-level updates;
/// it never owns the store's schema.
pub trait TripStore {
    /// Loads the checkpoint of an interrupted trip, if one exists.
    fn load_active(&self) -> Result<Option<TripCheckpoint>, StoreError>;

    /// Persists the active-trip checkpoint.
    fn save_active(&mut self, checkpoint: &TripCheckpoint) -> Result<(), StoreError>;

    /// Clears the active-trip checkpoint.
    fn clear_active(&mut self) -> Result<(), StoreError>;

    /// Appends a finished trip to history (user chose to save it).
    fn append_history(&mut self, trip: &Trip, summary: &TripSummary) -> Result<(), StoreError>;

    /// Reads the motor snapshot for a vehicle, used when recovering an
    /// interrupted trip.
    fn motor(&self, vehicle_id: &str) -> Result<Motor, StoreError>;

    /// Proposes a new fuel level for the vehicle profile.
    fn propose_fuel_level(&mut self, vehicle_id: &str, percent: f64) -> Result<(), StoreError>;
}
