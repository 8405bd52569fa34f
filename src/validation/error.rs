//! Error classification for room-presence estimation

use crate::processing::parser::ParseError;
use thiserror::Error;

/// Axis of a room volume corner, used when reporting inverted corners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Errors raised by configuration, registration and ingestion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PresenceError {
    // Configuration errors
    #[error("room '{room}': corners must be ordered low-to-high on every axis ({axis}: {low} > {high})")]
    InvertedCorners {
        room: String,
        axis: Axis,
        low: f64,
        high: f64,
    },
    #[error("non-finite coordinate for {owner}: ({x}, {y}, {z})")]
    NonFiniteCoordinate { owner: String, x: f64, y: f64, z: f64 },
    #[error("anchor '{name}' is registered more than once")]
    DuplicateAnchor { name: String },
    #[error("anchor '{name}': max distance must be positive, got {value}")]
    InvalidMaxDistance { name: String, value: f64 },
    #[error("configuration error: {parameter} = {value} ({reason})")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("failed to read configuration '{path}': {message}")]
    ConfigIo { path: String, message: String },
    #[error("failed to parse configuration: {message}")]
    ConfigFormat { message: String },

    // Ingestion errors
    #[error("update for unregistered anchor '{anchor}'")]
    UnknownAnchor { anchor: String },
    #[error("malformed payload from anchor '{anchor}' for '{entity}': {source}")]
    MalformedPayload {
        anchor: String,
        entity: String,
        #[source]
        source: ParseError,
    },
}

impl PresenceError {
    /// Whether the error only drops a single update rather than invalidating setup
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PresenceError::UnknownAnchor { .. } | PresenceError::MalformedPayload { .. }
        )
    }
}

/// Result type for presence operations
pub type PresenceResult<T> = Result<T, PresenceError>;
