//! trip-engine core
//!
//! Real-time trip tracking decision engine: route-deviation detection,
//! hysteresis-gated rerouting, proximity-based arrival, fuel accounting,
//! and a persisted trip lifecycle that survives process restarts. The
//! surrounding application owns maps, dialogs, and REST plumbing; this
//! crate consumes location samples and emits typed events.

pub mod arrival;
pub mod deviation;
pub mod errors;
pub mod events;
pub mod fuel;
pub mod geo;
pub mod lifecycle;
pub mod polyline;
pub mod remote;
pub mod reroute;
pub mod sync;
pub mod traits;
pub mod trip;

pub use errors::EngineError;
pub use events::{ProximityTier, TripEvent};
pub use lifecycle::{LifecycleConfig, TripLifecycle};
pub use trip::{LocationSample, Trip, TripStatus, TripSummary};
