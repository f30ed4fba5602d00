//! Periodic distance submission to the fuel-accounting backend.
//!
//! The scheduler is tick-driven: the host calls `on_tick` at whatever
//! cadence its timer provides, and due-time checks gate the actual
//! work. Transient failures retry with exponential backoff across
//! ticks; permanent failures surface immediately. The scheduler only
//! decides and calls the endpoint — committing the resulting trip and
//! motor mutations stays with `TripLifecycle`.

use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::traits::{DistanceSyncOutcome, DistanceSyncReport, FuelAccountingService};
use crate::trip::Trip;

/// Regular submission interval.
pub const SYNC_INTERVAL_MS: i64 = 5_000;

/// First retry delay; doubles per attempt.
pub const BACKOFF_BASE_MS: i64 = 1_000;

/// Retries after the initial failed attempt.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
struct RetryState {
    retries_done: u32,
    next_attempt_at_ms: i64,
}

/// What one due submission attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAttemptOutcome {
    /// The backend accounted the distance; the lifecycle should advance
    /// `last_synced_distance_km` and adopt the authoritative fuel level.
    Applied(DistanceSyncReport),
    /// The backend judged the delta sub-threshold; distance keeps
    /// accumulating toward the next submission.
    SkippedByBackend { reason: String },
    /// Transient failure; a retry is scheduled.
    RetryScheduled {
        error: SyncError,
        retries_done: u32,
        next_attempt_at_ms: i64,
    },
    /// Permanent failure or retries exhausted.
    Failed(SyncError),
}

/// Fixed-interval distance sync with backoff.
#[derive(Debug, Clone)]
pub struct DistanceSyncScheduler {
    next_sync_at_ms: i64,
    retry: Option<RetryState>,
}

impl DistanceSyncScheduler {
    pub fn new(now_ms: i64) -> Self {
        Self {
            next_sync_at_ms: now_ms + SYNC_INTERVAL_MS,
            retry: None,
        }
    }

    /// Drops any scheduled retry, e.g. when the trip stops.
    pub fn cancel(&mut self) {
        self.retry = None;
    }

    fn due_at(&self) -> i64 {
        self.retry
            .as_ref()
            .map(|retry| retry.next_attempt_at_ms)
            .unwrap_or(self.next_sync_at_ms)
    }

    /// Runs a submission if one is due. Safe to call at any cadence.
    pub fn on_tick(
        &mut self,
        now_ms: i64,
        trip: &Trip,
        accounting: &dyn FuelAccountingService,
    ) -> Option<SyncAttemptOutcome> {
        if now_ms < self.due_at() {
            return None;
        }

        if trip.unsynced_distance_km() <= 0.0 {
            // Nothing new to submit; a pending retry is moot.
            self.retry = None;
            self.next_sync_at_ms = now_ms + SYNC_INTERVAL_MS;
            return None;
        }

        Some(self.submit(now_ms, trip, accounting))
    }

    /// One final submission on trip stop, regardless of the schedule.
    /// Never retries; the trip is already over.
    pub fn flush(
        &mut self,
        trip: &Trip,
        accounting: &dyn FuelAccountingService,
    ) -> Option<SyncAttemptOutcome> {
        self.retry = None;
        if trip.unsynced_distance_km() <= 0.0 {
            return None;
        }
        let outcome = match accounting.sync_distance(
            &trip.vehicle_id,
            trip.cumulative_distance_km,
            trip.last_synced_distance_km,
        ) {
            Ok(DistanceSyncOutcome::Applied(report)) => SyncAttemptOutcome::Applied(report),
            Ok(DistanceSyncOutcome::Skipped { reason }) => {
                SyncAttemptOutcome::SkippedByBackend { reason }
            }
            Err(error) => SyncAttemptOutcome::Failed(error),
        };
        Some(outcome)
    }

    fn submit(
        &mut self,
        now_ms: i64,
        trip: &Trip,
        accounting: &dyn FuelAccountingService,
    ) -> SyncAttemptOutcome {
        // The regular cadence advances whether or not this attempt
        // succeeds; retries run on their own backoff deadlines.
        self.next_sync_at_ms = now_ms + SYNC_INTERVAL_MS;

        let result = accounting.sync_distance(
            &trip.vehicle_id,
            trip.cumulative_distance_km,
            trip.last_synced_distance_km,
        );

        match result {
            Ok(DistanceSyncOutcome::Applied(report)) => {
                debug!(
                    distance_km = trip.cumulative_distance_km,
                    fuel_percent = report.new_fuel_level_percent,
                    "distance sync applied"
                );
                self.retry = None;
                SyncAttemptOutcome::Applied(report)
            }
            Ok(DistanceSyncOutcome::Skipped { reason }) => {
                debug!(reason = %reason, "distance sync skipped by backend");
                self.retry = None;
                SyncAttemptOutcome::SkippedByBackend { reason }
            }
            Err(error) if error.is_retryable() => {
                let retries_done = self
                    .retry
                    .as_ref()
                    .map(|retry| retry.retries_done)
                    .unwrap_or(0);
                if retries_done >= MAX_RETRY_ATTEMPTS {
                    warn!(error = %error, "distance sync retries exhausted");
                    self.retry = None;
                    return SyncAttemptOutcome::Failed(error);
                }
                let delay = BACKOFF_BASE_MS << retries_done;
                let next_attempt_at_ms = now_ms + delay;
                self.retry = Some(RetryState {
                    retries_done: retries_done + 1,
                    next_attempt_at_ms,
                });
                warn!(error = %error, delay_ms = delay, "distance sync failed, retrying");
                SyncAttemptOutcome::RetryScheduled {
                    error,
                    retries_done: retries_done + 1,
                    next_attempt_at_ms,
                }
            }
            Err(error) => {
                warn!(error = %error, "distance sync failed permanently");
                self.retry = None;
                SyncAttemptOutcome::Failed(error)
            }
        }
    }
}
