//! Fuel consumption model.
//!
//! Drivable distance and local consumption are pure functions of a
//! `Motor` snapshot. Burning fuel over a distance delta is dual-path:
//! the remote accounting backend is authoritative (it may apply
//! nonlinear curves), with a local linear approximation as fallback so
//! the caller never blocks on network latency to reflect fuel burn.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::traits::FuelAccountingService;

/// Fuel level at or below this is low.
pub const LOW_FUEL_PERCENT: f64 = 20.0;

/// Fuel level at or below this is critical.
pub const CRITICAL_FUEL_PERCENT: f64 = 10.0;

/// Read snapshot of the vehicle's motor profile.
///
/// Owned by the vehicle-profile subsystem; the engine proposes new fuel
/// levels through the store but never persists them itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub fuel_tank_capacity_liters: f64,
    pub fuel_efficiency_km_per_liter: f64,
    pub current_fuel_level_percent: f64,
}

impl Motor {
    pub fn new(
        fuel_tank_capacity_liters: f64,
        fuel_efficiency_km_per_liter: f64,
        current_fuel_level_percent: f64,
    ) -> Self {
        Self {
            fuel_tank_capacity_liters,
            fuel_efficiency_km_per_liter,
            current_fuel_level_percent: current_fuel_level_percent.clamp(0.0, 100.0),
        }
    }
}

/// Maximum distance drivable on the current fuel level, in km.
///
/// Zero or missing tank/efficiency yields 0, never a division error.
pub fn drivable_distance_km(motor: &Motor) -> f64 {
    if !motor.fuel_tank_capacity_liters.is_finite()
        || !motor.fuel_efficiency_km_per_liter.is_finite()
        || motor.fuel_tank_capacity_liters <= 0.0
        || motor.fuel_efficiency_km_per_liter <= 0.0
    {
        return 0.0;
    }
    let level = motor.current_fuel_level_percent.clamp(0.0, 100.0);
    (level / 100.0) * motor.fuel_tank_capacity_liters * motor.fuel_efficiency_km_per_liter
}

/// Whether the current fuel level covers `distance_km`.
pub fn can_reach(motor: &Motor, distance_km: f64) -> bool {
    drivable_distance_km(motor) >= distance_km
}

/// Local linear approximation of the fuel level after driving
/// `incremental_distance_km`, clamped to [0, 100].
pub fn local_fuel_after_distance(motor: &Motor, incremental_distance_km: f64) -> f64 {
    let current = motor.current_fuel_level_percent.clamp(0.0, 100.0);
    if motor.fuel_tank_capacity_liters <= 0.0
        || motor.fuel_efficiency_km_per_liter <= 0.0
        || !incremental_distance_km.is_finite()
        || incremental_distance_km <= 0.0
    {
        return current;
    }
    let used_percent = (incremental_distance_km
        / motor.fuel_efficiency_km_per_liter
        / motor.fuel_tank_capacity_liters)
        * 100.0;
    (current - used_percent).clamp(0.0, 100.0)
}

/// Fuel level after driving `incremental_distance_km`.
///
/// Asks the remote accounting backend first; on failure falls back to
/// the local linear approximation. Always within [0, 100].
pub fn fuel_after_distance(
    motor: &Motor,
    incremental_distance_km: f64,
    accounting: &dyn FuelAccountingService,
) -> f64 {
    match accounting.fuel_after_distance(motor, incremental_distance_km) {
        Ok(level) => level.clamp(0.0, 100.0),
        Err(err) => {
            warn!(error = %err, "remote fuel computation failed, using local approximation");
            local_fuel_after_distance(motor, incremental_distance_km)
        }
    }
}

pub fn is_low_fuel(level_percent: f64) -> bool {
    level_percent <= LOW_FUEL_PERCENT
}

pub fn is_critical_fuel(level_percent: f64) -> bool {
    level_percent <= CRITICAL_FUEL_PERCENT
}
