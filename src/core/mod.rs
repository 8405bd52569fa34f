//! Core types and constants for room-presence estimation

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
