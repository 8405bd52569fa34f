//! Ingestion and consumer-facing API
//!
//! The registry is the ingress for the transport layer; adapters expose the
//! per-anchor proximity queries and subscriptions.

pub mod adapter;
pub mod callback;
pub mod registry;

pub use adapter::{detect_crossing, AnchorIngestionAdapter, Crossing, UpdateOutcome};
pub use callback::{
    DeviceRegistrar, NoopRegistrar, ProximityCallback, RoomChange, RoomChangeCallback,
    SubscriptionHandle,
};
pub use registry::AnchorRegistry;
