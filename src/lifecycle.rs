//! Trip lifecycle state machine.
//!
//! Owns the single active trip and every detector's state, processes
//! location samples and timer ticks one at a time, and is the only
//! place that commits mutations to the `Trip` record. All user-visible
//! moments come back as `TripEvent`s from the operation that produced
//! them.
//!
//! States: `planning` → `tracking` → `summary` → `planning`, with a
//! recovery path that resumes a persisted tracking trip after a crash
//! or background suspension.

use tracing::{debug, error, info, warn};

use crate::arrival::{self, ProximityLatches};
use crate::deviation::{self, DeviationState};
use crate::errors::{EngineError, LocationUnavailable, RouteUnavailable, StateTransitionInvalid};
use crate::events::TripEvent;
use crate::fuel::{self, Motor};
use crate::geo::{self, LatLng};
use crate::polyline::RoutePolyline;
use crate::reroute::{RerouteDecision, RerouteOutcome, ReroutePolicy};
use crate::sync::{DistanceSyncScheduler, SyncAttemptOutcome};
use crate::traits::{Clock, FuelAccountingService, LocationProvider, TripCheckpoint, TripStore};
use crate::trip::{LocationSample, RerouteRecord, Trip, TripStatus, TripSummary};

/// Tunables for sample acceptance and fuel updates.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Samples closer than this to the last accepted one are treated as
    /// jitter or duplicates and dropped, in meters.
    pub noise_floor_m: f64,
    /// Incremental distance that must accumulate before a fuel update
    /// runs, in km. Filters GPS micro-jitter from counting as travel.
    pub fuel_update_floor_km: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            noise_floor_m: 5.0,
            fuel_update_floor_km: 0.01,
        }
    }
}

/// Per-trip low-fuel notification latches, so thresholds fire once.
#[derive(Debug, Clone, Default)]
struct FuelNoticeLatches {
    low: bool,
    critical: bool,
}

/// The trip engine's top-level coordinator.
pub struct TripLifecycle<C, S, F> {
    config: LifecycleConfig,
    clock: C,
    store: S,
    accounting: F,
    trip: Option<Trip>,
    motor: Option<Motor>,
    route: Option<RoutePolyline>,
    deviation: DeviationState,
    latches: ProximityLatches,
    fuel_notices: FuelNoticeLatches,
    reroute: ReroutePolicy,
    scheduler: Option<DistanceSyncScheduler>,
    last_accepted: Option<LocationSample>,
    pending_fuel_km: f64,
    summary: Option<TripSummary>,
}

impl<C, S, F> TripLifecycle<C, S, F>
where
    C: Clock,
    S: TripStore,
    F: FuelAccountingService,
{
    pub fn new(config: LifecycleConfig, clock: C, store: S, accounting: F) -> Self {
        Self {
            config,
            clock,
            store,
            accounting,
            trip: None,
            motor: None,
            route: None,
            deviation: DeviationState::default(),
            latches: ProximityLatches::default(),
            fuel_notices: FuelNoticeLatches::default(),
            reroute: ReroutePolicy::new(),
            scheduler: None,
            last_accepted: None,
            pending_fuel_km: 0.0,
            summary: None,
        }
    }

    // ------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------

    pub fn status(&self) -> TripStatus {
        self.trip
            .as_ref()
            .map(|trip| trip.status)
            .unwrap_or(TripStatus::Planning)
    }

    pub fn trip(&self) -> Option<&Trip> {
        self.trip.as_ref()
    }

    pub fn summary(&self) -> Option<&TripSummary> {
        self.summary.as_ref()
    }

    pub fn deviation_state(&self) -> &DeviationState {
        &self.deviation
    }

    pub fn route(&self) -> Option<&RoutePolyline> {
        self.route.as_ref()
    }

    /// Current drivable-distance estimate from the motor snapshot.
    pub fn drivable_distance_km(&self) -> Option<f64> {
        self.motor.as_ref().map(fuel::drivable_distance_km)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Starts tracking a new trip. Only valid from `planning`.
    ///
    /// Requires a valid current position; on `LocationUnavailable` the
    /// machine stays in `planning` so the caller can re-prompt and retry.
    pub fn start(
        &mut self,
        location: &mut dyn LocationProvider,
        vehicle_id: &str,
        motor: Motor,
        destination: Option<LatLng>,
        route: Option<RoutePolyline>,
    ) -> Result<Vec<TripEvent>, EngineError> {
        self.guard(TripStatus::Planning, "start")?;

        let origin = location.current_position()?;
        if origin.position().is_none() {
            return Err(LocationUnavailable::InvalidCoordinates.into());
        }

        let now_ms = self.clock.now_ms();
        let trip = Trip::new(
            vehicle_id,
            now_ms,
            destination,
            motor.current_fuel_level_percent,
        );

        // Clear artifacts of any previous trip before persisting the new one.
        self.store.clear_active()?;
        self.store.save_active(&TripCheckpoint {
            trip: trip.clone(),
            route: route.clone(),
            deviation: DeviationState::default(),
            latches: ProximityLatches::default(),
            last_accepted_sample: Some(origin),
        })?;

        info!(trip_id = %trip.id, vehicle_id, "trip started");

        self.trip = Some(trip);
        self.motor = Some(motor);
        self.route = route;
        self.deviation = DeviationState::default();
        self.latches = ProximityLatches::default();
        self.fuel_notices = FuelNoticeLatches::default();
        self.reroute = ReroutePolicy::new();
        self.scheduler = Some(DistanceSyncScheduler::new(now_ms));
        self.last_accepted = Some(origin);
        self.pending_fuel_km = 0.0;
        self.summary = None;

        Ok(vec![TripEvent::TripStateChanged(TripStatus::Tracking)])
    }

    /// Feeds one location sample through deviation, fuel, and arrival
    /// detection. Samples outside `tracking` are ignored.
    pub fn on_location_sample(&mut self, sample: LocationSample) -> Vec<TripEvent> {
        if self.status() != TripStatus::Tracking {
            debug!("ignoring location sample outside tracking");
            return Vec::new();
        }
        match self.process_sample(sample) {
            Ok(events) => events,
            Err(err) => self.emergency_cleanup(err),
        }
    }

    /// Drives the sync scheduler. Call at any cadence; due-time checks
    /// gate the actual work.
    pub fn on_tick(&mut self) -> Vec<TripEvent> {
        if self.status() != TripStatus::Tracking {
            return Vec::new();
        }
        let now_ms = self.clock.now_ms();

        let outcome = match (self.scheduler.as_mut(), self.trip.as_ref()) {
            (Some(scheduler), Some(trip)) => scheduler.on_tick(now_ms, trip, &self.accounting),
            _ => None,
        };

        let mut events = Vec::new();
        match outcome {
            Some(SyncAttemptOutcome::Applied(report)) => {
                self.apply_sync_report(&report, &mut events);
                self.checkpoint_best_effort();
            }
            Some(SyncAttemptOutcome::Failed(sync_error)) => {
                events.push(TripEvent::SyncFailed { error: sync_error });
            }
            // Retries and backend skips stay silent; sync is background.
            Some(SyncAttemptOutcome::RetryScheduled { .. })
            | Some(SyncAttemptOutcome::SkippedByBackend { .. })
            | None => {}
        }
        events
    }

    /// Result of the reroute requested earlier via `RerouteRequested`.
    ///
    /// Late results arriving after the trip left `tracking` are
    /// discarded.
    pub fn apply_reroute_result(
        &mut self,
        result: Result<RoutePolyline, RouteUnavailable>,
    ) -> Vec<TripEvent> {
        if self.status() != TripStatus::Tracking {
            debug!("discarding reroute result outside tracking");
            self.reroute.cancel();
            return Vec::new();
        }
        match result {
            Ok(route) => {
                self.reroute.complete(RerouteOutcome::Success);
                info!(points = route.points().len(), "route replaced after reroute");
                self.route = Some(route);
                self.deviation.reset_counter();
                self.checkpoint_best_effort();
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "reroute failed");
                self.reroute.complete(RerouteOutcome::Failure);
                vec![TripEvent::RerouteFailed]
            }
        }
    }

    /// Ends the trip. Only valid from `tracking`.
    pub fn stop(&mut self, has_arrived: bool) -> Result<(TripSummary, Vec<TripEvent>), EngineError> {
        self.guard(TripStatus::Tracking, "stop")?;
        let events = self.finish_trip(has_arrived);
        let summary = self
            .summary
            .clone()
            .unwrap_or_else(|| self.fallback_summary());
        Ok((summary, events))
    }

    /// Persists the finished trip to history and returns to `planning`.
    pub fn save(&mut self) -> Result<Vec<TripEvent>, EngineError> {
        self.guard(TripStatus::Summary, "save")?;
        if let (Some(trip), Some(summary)) = (self.trip.as_ref(), self.summary.as_ref()) {
            self.store.append_history(trip, summary)?;
        }
        self.store.clear_active()?;
        self.clear_trip();
        info!("trip saved to history");
        Ok(vec![TripEvent::TripStateChanged(TripStatus::Planning)])
    }

    /// Drops the finished trip without persisting it.
    pub fn discard(&mut self) -> Result<Vec<TripEvent>, EngineError> {
        self.guard(TripStatus::Summary, "discard")?;
        self.store.clear_active()?;
        self.clear_trip();
        info!("trip discarded");
        Ok(vec![TripEvent::TripStateChanged(TripStatus::Planning)])
    }

    /// Resumes an interrupted tracking trip from its persisted
    /// checkpoint, if one exists. Call once on process start.
    ///
    /// Stale checkpoints in any other state are cleared.
    pub fn recover(&mut self) -> Result<Option<Vec<TripEvent>>, EngineError> {
        self.guard(TripStatus::Planning, "recover")?;

        let Some(checkpoint) = self.store.load_active()? else {
            return Ok(None);
        };
        if checkpoint.trip.status != TripStatus::Tracking {
            debug!("clearing stale non-tracking checkpoint");
            self.store.clear_active()?;
            return Ok(None);
        }

        let motor = self.store.motor(&checkpoint.trip.vehicle_id)?;
        let now_ms = self.clock.now_ms();

        info!(
            trip_id = %checkpoint.trip.id,
            distance_km = checkpoint.trip.cumulative_distance_km,
            "recovered interrupted trip"
        );

        self.trip = Some(checkpoint.trip);
        self.motor = Some(motor);
        self.route = checkpoint.route;
        self.deviation = checkpoint.deviation;
        self.latches = checkpoint.latches;
        self.fuel_notices = FuelNoticeLatches::default();
        self.reroute = ReroutePolicy::new();
        self.scheduler = Some(DistanceSyncScheduler::new(now_ms));
        self.last_accepted = checkpoint.last_accepted_sample;
        self.pending_fuel_km = 0.0;
        self.summary = None;

        Ok(Some(vec![TripEvent::TripStateChanged(TripStatus::Tracking)]))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn guard(&self, expected: TripStatus, attempted: &'static str) -> Result<(), EngineError> {
        let current = self.status();
        if current != expected {
            return Err(StateTransitionInvalid {
                from: current,
                attempted,
            }
            .into());
        }
        Ok(())
    }

    fn process_sample(&mut self, sample: LocationSample) -> Result<Vec<TripEvent>, EngineError> {
        let Some(position) = sample.position() else {
            warn!(
                latitude = sample.latitude,
                longitude = sample.longitude,
                "dropping sample with invalid coordinates"
            );
            return Ok(Vec::new());
        };

        // Segment from the last accepted sample; jitter and duplicates
        // below the noise floor never reach the detectors.
        let previous = self
            .last_accepted
            .and_then(|last| last.position().map(|last_position| (last, last_position)));
        let (segment_km, speed_kmh) = match previous {
            Some((last, last_position)) => {
                let segment_m = geo::distance(last_position, position).unwrap_or(0.0);
                if segment_m < self.config.noise_floor_m {
                    return Ok(Vec::new());
                }
                let dt_ms = sample.timestamp_ms - last.timestamp_ms;
                let speed_kmh = if dt_ms > 0 {
                    (segment_m / 1_000.0) / (dt_ms as f64 / 3_600_000.0)
                } else {
                    0.0
                };
                (segment_m / 1_000.0, speed_kmh)
            }
            None => (0.0, 0.0),
        };

        self.last_accepted = Some(sample);
        let now_ms = self.clock.now_ms();
        let mut events = Vec::new();
        let mut arrived_now = false;

        let Some(trip) = self.trip.as_mut() else {
            return Ok(Vec::new());
        };
        // Distance accumulation is monotonic: segment lengths between
        // accepted samples only, never raw backtracking positions.
        trip.cumulative_distance_km += segment_km;
        self.pending_fuel_km += segment_km;

        // Deviation detection, only while a route exists.
        if let Some(route) = self.route.as_ref() {
            let verdict = deviation::assess(&mut self.deviation, position, route, speed_kmh);
            if let deviation::DeviationVerdict::Deviated {
                distance_from_route_m,
            } = verdict
            {
                if self.deviation.consecutive_off_route
                    == deviation::REQUIRED_CONSECUTIVE_BREACHES
                {
                    events.push(TripEvent::DeviationDetected {
                        distance_from_route_m,
                    });
                }
                match self.reroute.on_deviation(&mut self.deviation, now_ms) {
                    RerouteDecision::Request => {
                        let reason = format!("off route by {:.0} m", distance_from_route_m);
                        trip.reroute_count += 1;
                        trip.reroute_history.push(RerouteRecord {
                            timestamp_ms: now_ms,
                            reason: reason.clone(),
                        });
                        info!(reason = %reason, "reroute requested");
                        events.push(TripEvent::RerouteRequested { reason });
                    }
                    RerouteDecision::SuppressedInFlight
                    | RerouteDecision::SuppressedCooldown => {}
                }
            }
        }

        // Fuel update once enough incremental distance accumulated.
        if self.pending_fuel_km >= self.config.fuel_update_floor_km {
            if let Some(motor) = self.motor.as_mut() {
                let level =
                    fuel::fuel_after_distance(motor, self.pending_fuel_km, &self.accounting);
                motor.current_fuel_level_percent = level;
                self.pending_fuel_km = 0.0;
                if let Err(err) = self.store.propose_fuel_level(&trip.vehicle_id, level) {
                    warn!(error = %err, "failed to propose fuel level");
                }
                push_fuel_events(&mut self.fuel_notices, level, false, &mut events);
            }
        }

        // Arrival detection, only while a destination is set.
        if let Some(destination) = trip.destination {
            let assessment = arrival::assess(&mut self.latches, position, destination);
            for tier in assessment.tiers_crossed {
                events.push(TripEvent::ProximityTierCrossed(tier));
            }
            if assessment.arrived {
                trip.has_arrived = true;
                arrived_now = true;
            }
        }

        if arrived_now {
            // The only condition under which tracking auto-stops.
            events.push(TripEvent::Arrived);
            events.extend(self.finish_trip(true));
        } else {
            self.checkpoint()?;
        }

        Ok(events)
    }

    /// Adopts an authoritative sync report: advances the synced distance
    /// using the then-current cumulative value and takes the backend's
    /// fuel level.
    fn apply_sync_report(
        &mut self,
        report: &crate::traits::DistanceSyncReport,
        events: &mut Vec<TripEvent>,
    ) {
        let Some(trip) = self.trip.as_mut() else {
            return;
        };
        trip.last_synced_distance_km = trip.cumulative_distance_km;

        let level = report.new_fuel_level_percent.clamp(0.0, 100.0);
        if let Some(motor) = self.motor.as_mut() {
            motor.current_fuel_level_percent = level;
        }
        if let Err(err) = self.store.propose_fuel_level(&trip.vehicle_id, level) {
            warn!(error = %err, "failed to propose fuel level");
        }
        push_fuel_events(
            &mut self.fuel_notices,
            level,
            report.low_fuel_warning,
            events,
        );
    }

    /// Moves the trip to `summary`, flushing unsynced distance and
    /// computing final figures. Infallible by design: failures along the
    /// way degrade to partial data rather than blocking the transition.
    fn finish_trip(&mut self, has_arrived: bool) -> Vec<TripEvent> {
        let mut events = Vec::new();
        let now_ms = self.clock.now_ms();

        // Pending reroutes and sync retries die with the trip.
        self.reroute.cancel();

        let flush_outcome = match (self.scheduler.take(), self.trip.as_ref()) {
            (Some(mut scheduler), Some(trip)) => scheduler.flush(trip, &self.accounting),
            _ => None,
        };
        match flush_outcome {
            Some(SyncAttemptOutcome::Applied(report)) => {
                self.apply_sync_report(&report, &mut events);
            }
            Some(SyncAttemptOutcome::Failed(sync_error)) => {
                events.push(TripEvent::SyncFailed { error: sync_error });
            }
            _ => {}
        }

        if let Some(trip) = self.trip.as_mut() {
            trip.has_arrived = trip.has_arrived || has_arrived;
            trip.status = TripStatus::Summary;

            let current_fuel = self
                .motor
                .as_ref()
                .map(|motor| motor.current_fuel_level_percent)
                .unwrap_or(trip.starting_fuel_percent);
            let summary = TripSummary::from_trip(trip, now_ms, current_fuel);
            info!(
                trip_id = %trip.id,
                distance_km = summary.distance_km,
                successful = summary.is_successful,
                "trip finished"
            );
            self.summary = Some(summary);
        }

        self.deviation = DeviationState::default();
        self.latches.reset();
        self.pending_fuel_km = 0.0;
        self.checkpoint_best_effort();

        events.push(TripEvent::TripStateChanged(TripStatus::Summary));
        events
    }

    /// Degraded path for unexpected internal errors: force the machine
    /// into `summary` with best-effort data instead of leaving it stuck
    /// mid-transition.
    fn emergency_cleanup(&mut self, err: EngineError) -> Vec<TripEvent> {
        error!(error = %err, "unexpected failure, forcing summary transition");
        let mut events = vec![TripEvent::RecoverableError {
            message: err.to_string(),
        }];
        if self.trip.is_some() {
            events.extend(self.finish_trip(false));
        }
        events
    }

    fn clear_trip(&mut self) {
        self.trip = None;
        self.motor = None;
        self.route = None;
        self.deviation = DeviationState::default();
        self.latches = ProximityLatches::default();
        self.fuel_notices = FuelNoticeLatches::default();
        self.reroute = ReroutePolicy::new();
        self.scheduler = None;
        self.last_accepted = None;
        self.pending_fuel_km = 0.0;
        self.summary = None;
    }

    fn checkpoint(&mut self) -> Result<(), EngineError> {
        let Some(trip) = self.trip.as_ref() else {
            return Ok(());
        };
        let checkpoint = TripCheckpoint {
            trip: trip.clone(),
            route: self.route.clone(),
            deviation: self.deviation.clone(),
            latches: self.latches.clone(),
            last_accepted_sample: self.last_accepted,
        };
        self.store.save_active(&checkpoint)?;
        Ok(())
    }

    fn checkpoint_best_effort(&mut self) {
        if let Err(err) = self.checkpoint() {
            warn!(error = %err, "failed to persist trip checkpoint");
        }
    }

    fn fallback_summary(&self) -> TripSummary {
        // Only reachable if finish_trip ran without an active trip,
        // which the `stop` guard prevents.
        TripSummary {
            trip_id: String::new(),
            duration_ms: 0,
            distance_km: 0.0,
            average_speed_kmh: 0.0,
            fuel_used_percent: 0.0,
            has_arrived: false,
            is_successful: false,
            outcome: crate::trip::TripOutcome::Cancelled,
        }
    }
}

/// Emits low/critical fuel events at most once per trip each.
fn push_fuel_events(
    latches: &mut FuelNoticeLatches,
    level_percent: f64,
    backend_low_warning: bool,
    events: &mut Vec<TripEvent>,
) {
    if fuel::is_critical_fuel(level_percent) && !latches.critical {
        latches.critical = true;
        events.push(TripEvent::CriticalFuel { level_percent });
    }
    if (fuel::is_low_fuel(level_percent) || backend_low_warning) && !latches.low {
        latches.low = true;
        events.push(TripEvent::LowFuel { level_percent });
    }
}
