//! Configuration loading

pub mod config;

pub use config::{AnchorConfig, Corner, PresenceConfig, RoomVolumeConfig};
