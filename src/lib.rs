//! Indoor Room-Presence Estimation
//!
//! Infers which room a Bluetooth-tagged entity occupies from distance readings
//! reported by fixed anchors, by weighted voting over a precomputed lattice of
//! candidate points.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{SpatialPoint, CoordinateKey, UNKNOWN_ROOM, LATTICE_SPACING};
pub use algorithms::{Anchor, RatedCandidate, Coordinator, CandidateScore, WinnerSelection};
pub use processing::{DistanceSample, TrackedEntity, EntityStore, PayloadParser, ParseError};
pub use validation::{PresenceError, PresenceResult};
pub use utils::{PresenceConfig, AnchorConfig, RoomVolumeConfig, Corner};
pub use api::{
    AnchorIngestionAdapter, AnchorRegistry, UpdateOutcome, ProximityCallback, RoomChange,
    RoomChangeCallback, DeviceRegistrar, SubscriptionHandle
};
