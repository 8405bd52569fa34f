//! Error types

pub mod error;

pub use error::{Axis, PresenceError, PresenceResult};
