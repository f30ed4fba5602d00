//! Test fixtures for trip-engine.
//!
//! Provides a manual clock, an in-memory trip store, a fake
//! fuel-accounting backend with a linear consumption model, and
//! coordinate helpers around a Las Vegas base point.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trip_engine::errors::{LocationUnavailable, StoreError, SyncError};
use trip_engine::fuel::Motor;
use trip_engine::geo::LatLng;
use trip_engine::polyline::RoutePolyline;
use trip_engine::traits::{
    Clock, DistanceSyncOutcome, DistanceSyncReport, FuelAccountingService, LocationProvider,
    TripCheckpoint, TripStore,
};
use trip_engine::trip::{LocationSample, Trip, TripSummary};

/// Meters per degree of latitude at these scales.
pub const METERS_PER_DEG_LAT: f64 = 111_195.0;

// ============================================================================
// Clock
// ============================================================================

/// Hand-advanced clock shared between the test and the lifecycle.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        let clock = Self::default();
        clock.set(start_ms);
        clock
    }

    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct StoreInner {
    pub active: Option<TripCheckpoint>,
    pub history: Vec<(Trip, TripSummary)>,
    pub motor: Option<Motor>,
    pub proposed_fuel_levels: Vec<f64>,
    pub fail_saves: bool,
}

/// In-memory `TripStore`; clone the handle to inspect state after the
/// lifecycle has taken ownership.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub inner: Rc<RefCell<StoreInner>>,
}

impl MemoryStore {
    pub fn with_motor(motor: Motor) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().motor = Some(motor);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        self.inner.borrow_mut().fail_saves = fail;
    }
}

impl TripStore for MemoryStore {
    fn load_active(&self) -> Result<Option<TripCheckpoint>, StoreError> {
        Ok(self.inner.borrow().active.clone())
    }

    fn save_active(&mut self, checkpoint: &TripCheckpoint) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_saves {
            return Err(StoreError::new("disk full"));
        }
        inner.active = Some(checkpoint.clone());
        Ok(())
    }

    fn clear_active(&mut self) -> Result<(), StoreError> {
        self.inner.borrow_mut().active = None;
        Ok(())
    }

    fn append_history(&mut self, trip: &Trip, summary: &TripSummary) -> Result<(), StoreError> {
        self.inner
            .borrow_mut()
            .history
            .push((trip.clone(), summary.clone()));
        Ok(())
    }

    fn motor(&self, _vehicle_id: &str) -> Result<Motor, StoreError> {
        self.inner
            .borrow()
            .motor
            .clone()
            .ok_or_else(|| StoreError::new("unknown vehicle"))
    }

    fn propose_fuel_level(&mut self, _vehicle_id: &str, percent: f64) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.proposed_fuel_levels.push(percent);
        if let Some(motor) = inner.motor.as_mut() {
            motor.current_fuel_level_percent = percent;
        }
        Ok(())
    }
}

// ============================================================================
// Fuel accounting backend
// ============================================================================

#[derive(Default)]
pub struct AccountingInner {
    /// Backend's own record of the vehicle, consumed linearly per sync.
    pub motor: Option<Motor>,
    pub sync_calls: u32,
    pub fuel_calls: u32,
    pub fail_sync_with: Option<SyncError>,
    pub fail_fuel_computation: bool,
}

/// Fake remote backend applying a linear consumption model.
#[derive(Clone, Default)]
pub struct FakeAccounting {
    pub inner: Rc<RefCell<AccountingInner>>,
}

impl FakeAccounting {
    pub fn with_motor(motor: Motor) -> Self {
        let accounting = Self::default();
        accounting.inner.borrow_mut().motor = Some(motor);
        accounting
    }

    /// Remote fuel computation becomes unavailable; the engine must fall
    /// back to its local approximation.
    pub fn fuel_computation_unavailable(&self) {
        self.inner.borrow_mut().fail_fuel_computation = true;
    }

    pub fn fail_sync_with(&self, error: Option<SyncError>) {
        self.inner.borrow_mut().fail_sync_with = error;
    }

    pub fn sync_calls(&self) -> u32 {
        self.inner.borrow().sync_calls
    }
}

fn linear_level_after(motor: &Motor, delta_km: f64) -> f64 {
    if motor.fuel_tank_capacity_liters <= 0.0 || motor.fuel_efficiency_km_per_liter <= 0.0 {
        return motor.current_fuel_level_percent;
    }
    let used = (delta_km / motor.fuel_efficiency_km_per_liter / motor.fuel_tank_capacity_liters)
        * 100.0;
    (motor.current_fuel_level_percent - used).clamp(0.0, 100.0)
}

impl FuelAccountingService for FakeAccounting {
    fn sync_distance(
        &self,
        _vehicle_id: &str,
        cumulative_distance_km: f64,
        last_synced_distance_km: f64,
    ) -> Result<DistanceSyncOutcome, SyncError> {
        let mut inner = self.inner.borrow_mut();
        inner.sync_calls += 1;
        if let Some(error) = inner.fail_sync_with.clone() {
            return Err(error);
        }
        let delta_km = (cumulative_distance_km - last_synced_distance_km).max(0.0);
        let Some(motor) = inner.motor.as_mut() else {
            return Err(SyncError::permanent("unknown vehicle"));
        };
        let previous = motor.current_fuel_level_percent;
        let new_level = linear_level_after(motor, delta_km);
        motor.current_fuel_level_percent = new_level;
        let drivable = (new_level / 100.0)
            * motor.fuel_tank_capacity_liters
            * motor.fuel_efficiency_km_per_liter;
        Ok(DistanceSyncOutcome::Applied(DistanceSyncReport {
            actual_distance_traveled_km: delta_km,
            fuel_used_percent: previous - new_level,
            new_fuel_level_percent: new_level,
            low_fuel_warning: new_level <= 20.0,
            drivable_distance_km: drivable,
        }))
    }

    fn fuel_after_distance(
        &self,
        motor: &Motor,
        incremental_distance_km: f64,
    ) -> Result<f64, SyncError> {
        let mut inner = self.inner.borrow_mut();
        inner.fuel_calls += 1;
        if inner.fail_fuel_computation {
            return Err(SyncError::transient("fuel service unreachable"));
        }
        Ok(linear_level_after(motor, incremental_distance_km))
    }
}

// ============================================================================
// Location provider
// ============================================================================

/// Start-time location provider with a fixed answer.
pub struct FixedLocation(pub Result<LocationSample, LocationUnavailable>);

impl LocationProvider for FixedLocation {
    fn current_position(&mut self) -> Result<LocationSample, LocationUnavailable> {
        self.0
    }
}

// ============================================================================
// Coordinate helpers
// ============================================================================

/// Base point in Las Vegas.
pub fn base() -> LatLng {
    LatLng::new(36.1, -115.2).unwrap()
}

/// A point `meters` north of `origin`.
pub fn north_of(origin: LatLng, meters: f64) -> LatLng {
    LatLng::new(origin.latitude + meters / METERS_PER_DEG_LAT, origin.longitude).unwrap()
}

/// A point `meters` east of `origin`.
pub fn east_of(origin: LatLng, meters: f64) -> LatLng {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * origin.latitude.to_radians().cos();
    LatLng::new(origin.latitude, origin.longitude + meters / meters_per_deg_lng).unwrap()
}

pub fn sample_at(position: LatLng, timestamp_ms: i64) -> LocationSample {
    LocationSample::new(position.latitude, position.longitude, timestamp_ms)
}

/// Straight east-west route through the base point, 2 km long.
pub fn straight_route() -> RoutePolyline {
    RoutePolyline::new(vec![base(), east_of(base(), 2_000.0)])
}

/// Standard test motor: 15 L tank, 40 km/L, 50% fuel (300 km drivable).
pub fn test_motor() -> Motor {
    Motor::new(15.0, 40.0, 50.0)
}
