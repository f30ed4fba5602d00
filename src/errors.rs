//! Error taxonomy for the trip engine.
//!
//! Each category maps to a distinct recovery strategy for the caller:
//! location failures re-prompt the user, transient sync failures retry,
//! permanent sync failures surface immediately, and invalid transitions
//! are programming errors that fail loudly.

use std::fmt;

use crate::trip::TripStatus;

/// Why a current position could not be obtained.
///
/// Subtypes are distinguishable so the presentation layer can give
/// targeted guidance (open settings vs. move to open sky).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationUnavailable {
    PermissionDenied,
    GpsDisabled,
    Timeout,
    WeakSignal,
    InvalidCoordinates,
}

impl fmt::Display for LocationUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            LocationUnavailable::PermissionDenied => "location permission denied",
            LocationUnavailable::GpsDisabled => "gps disabled",
            LocationUnavailable::Timeout => "location request timed out",
            LocationUnavailable::WeakSignal => "location signal too weak",
            LocationUnavailable::InvalidCoordinates => "coordinates out of range",
        };
        f.write_str(reason)
    }
}

/// The external routing service failed to produce a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUnavailable {
    pub message: String,
}

impl RouteUnavailable {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RouteUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "routing service failure: {}", self.message)
    }
}

/// Failure of the remote fuel/distance-accounting endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network error or 5xx. Safe to retry with backoff.
    Transient { message: String },
    /// 4xx or malformed payload. Retrying would fail identically.
    Permanent { message: String },
}

impl SyncError {
    pub fn transient(message: impl Into<String>) -> Self {
        SyncError::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        SyncError::Permanent {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Transient { message } => write!(f, "transient sync failure: {}", message),
            SyncError::Permanent { message } => write!(f, "permanent sync failure: {}", message),
        }
    }
}

/// Attempted lifecycle transition from the wrong state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransitionInvalid {
    pub from: TripStatus,
    pub attempted: &'static str,
}

impl fmt::Display for StateTransitionInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} while in {:?} state", self.attempted, self.from)
    }
}

/// Persistence store failure (active-trip checkpoint or history).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trip store failure: {}", self.message)
    }
}

/// Top-level engine error.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Location(LocationUnavailable),
    Route(RouteUnavailable),
    Sync(SyncError),
    InvalidTransition(StateTransitionInvalid),
    Store(StoreError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Location(err) => err.fmt(f),
            EngineError::Route(err) => err.fmt(f),
            EngineError::Sync(err) => err.fmt(f),
            EngineError::InvalidTransition(err) => err.fmt(f),
            EngineError::Store(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<LocationUnavailable> for EngineError {
    fn from(err: LocationUnavailable) -> Self {
        EngineError::Location(err)
    }
}

impl From<RouteUnavailable> for EngineError {
    fn from(err: RouteUnavailable) -> Self {
        EngineError::Route(err)
    }
}

impl From<SyncError> for EngineError {
    fn from(err: SyncError) -> Self {
        EngineError::Sync(err)
    }
}

impl From<StateTransitionInvalid> for EngineError {
    fn from(err: StateTransitionInvalid) -> Self {
        EngineError::InvalidTransition(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Store(err)
    }
}
