//! Lattice granularity and rating parameters

/// Spacing of the candidate lattice on every axis
pub const LATTICE_SPACING: f64 = 0.5;

/// Number of lattice steps per unit of distance
pub const STEPS_PER_UNIT: f64 = 1.0 / LATTICE_SPACING;

/// Default range beyond which an anchor ignores lattice points
pub const DEFAULT_MAX_DISTANCE: f64 = 8.0;

/// Default freshness window for distance samples (seconds)
pub const DEFAULT_MAX_SAMPLE_AGE_SECS: u64 = 120;

/// Room reported when no candidate point could be resolved
pub const UNKNOWN_ROOM: &str = "unknown";

/// Farthest a raw distance can sit beyond an anchor's range and still reach a bucket
pub const MAX_BUCKET_REACH: f64 = 2.0;

/// Bucket offsets (in lattice steps) around a measured distance and their ratings.
/// Order matters: candidates are emitted in this order.
pub const BUCKET_RATINGS: [(i64, f64); 7] = [
    (0, 100.0),
    (1, 30.0),
    (-1, 30.0),
    (2, 15.0),
    (-2, 15.0),
    (3, 7.5),
    (-3, 7.5),
];
