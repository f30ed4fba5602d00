//! Trip record, location samples, and end-of-trip summary figures.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// One position fix from the location stream.
///
/// Samples are ordered by timestamp but may arrive with jitter; the
/// lifecycle drops samples whose position delta from the last accepted
/// sample falls below the noise floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        LatLng::new(self.latitude, self.longitude).ok()
    }
}

/// Lifecycle state of the active trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    /// No active trip; the next transition is `start`.
    Planning,
    /// Samples are being accepted and the sync scheduler is running.
    Tracking,
    /// Trip ended, awaiting user save or discard.
    Summary,
}

/// Why a reroute was requested, recorded in the trip's reroute history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteRecord {
    pub timestamp_ms: i64,
    pub reason: String,
}

/// The single active trip record.
///
/// Only `TripLifecycle` commits mutations; detectors receive it (or
/// pieces of it) read-only and return proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub vehicle_id: String,
    pub status: TripStatus,
    pub start_time_ms: i64,
    pub destination: Option<LatLng>,
    pub cumulative_distance_km: f64,
    pub last_synced_distance_km: f64,
    pub starting_fuel_percent: f64,
    pub reroute_count: u32,
    pub reroute_history: Vec<RerouteRecord>,
    pub has_arrived: bool,
}

impl Trip {
    pub fn new(
        vehicle_id: impl Into<String>,
        start_time_ms: i64,
        destination: Option<LatLng>,
        starting_fuel_percent: f64,
    ) -> Self {
        Self {
            id: format!("trip-{}", start_time_ms),
            vehicle_id: vehicle_id.into(),
            status: TripStatus::Tracking,
            start_time_ms,
            destination,
            cumulative_distance_km: 0.0,
            last_synced_distance_km: 0.0,
            starting_fuel_percent,
            reroute_count: 0,
            reroute_history: Vec::new(),
            has_arrived: false,
        }
    }

    /// Distance accumulated since the last successful sync.
    pub fn unsynced_distance_km(&self) -> f64 {
        (self.cumulative_distance_km - self.last_synced_distance_km).max(0.0)
    }
}

/// Final classification of a finished trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripOutcome {
    Completed,
    Cancelled,
}

/// Figures computed when a trip leaves `tracking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: String,
    pub duration_ms: i64,
    pub distance_km: f64,
    pub average_speed_kmh: f64,
    pub fuel_used_percent: f64,
    pub has_arrived: bool,
    pub is_successful: bool,
    pub outcome: TripOutcome,
}

impl TripSummary {
    /// Builds summary figures from a finished trip.
    ///
    /// Free-roam trips (no destination) are always successful; trips
    /// with a destination are successful only on arrival.
    pub fn from_trip(trip: &Trip, end_time_ms: i64, current_fuel_percent: f64) -> Self {
        let duration_ms = (end_time_ms - trip.start_time_ms).max(0);
        let hours = duration_ms as f64 / 3_600_000.0;
        let average_speed_kmh = if hours > 0.0 {
            trip.cumulative_distance_km / hours
        } else {
            0.0
        };
        let is_successful = trip.destination.is_none() || trip.has_arrived;

        Self {
            trip_id: trip.id.clone(),
            duration_ms,
            distance_km: trip.cumulative_distance_km,
            average_speed_kmh,
            fuel_used_percent: (trip.starting_fuel_percent - current_fuel_percent).max(0.0),
            has_arrived: trip.has_arrived,
            is_successful,
            outcome: if is_successful {
                TripOutcome::Completed
            } else {
                TripOutcome::Cancelled
            },
        }
    }
}
