//! Core data types for room-presence estimation

use crate::core::constants::{LATTICE_SPACING, STEPS_PER_UNIT};
use crate::validation::error::{Axis, PresenceError, PresenceResult};
use nalgebra::Vector3;

/// Identity of a lattice point, built from its exact coordinates
pub type CoordinateKey = String;

/// Round a distance to the nearest lattice step
pub fn quantize(distance: f64) -> f64 {
    (distance * STEPS_PER_UNIT).round() / STEPS_PER_UNIT
}

/// Number of whole lattice steps in a quantized distance
pub fn to_steps(distance: f64) -> i64 {
    (distance * STEPS_PER_UNIT).round() as i64
}

/// Immutable 3D point tagged with the room it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPoint {
    position: Vector3<f64>,
    room: String,
    key: CoordinateKey,
}

impl SpatialPoint {
    pub fn new(x: f64, y: f64, z: f64, room: impl Into<String>) -> Self {
        Self::from_vector(Vector3::new(x, y, z), room)
    }

    pub fn from_vector(position: Vector3<f64>, room: impl Into<String>) -> Self {
        let key = format!("{}:{}:{}", position.x, position.y, position.z);
        Self {
            position,
            room: room.into(),
            key,
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Deterministic identity built from the unrounded coordinates
    pub fn coordinate_key(&self) -> &str {
        &self.key
    }

    pub fn euclidean_distance(&self, other: &SpatialPoint) -> f64 {
        (self.position - other.position).norm()
    }

    /// Euclidean distance rounded to the nearest lattice step
    pub fn quantized_distance(&self, other: &SpatialPoint) -> f64 {
        quantize(self.euclidean_distance(other))
    }

    /// Every point between two corners (inclusive) at lattice spacing.
    ///
    /// `corner1` must be componentwise less than or equal to `corner2`; inverted
    /// corners are reported rather than reordered.
    pub fn generate_lattice(
        corner1: &Vector3<f64>,
        corner2: &Vector3<f64>,
        room: &str,
    ) -> PresenceResult<Vec<SpatialPoint>> {
        validate_volume(corner1, corner2, room)?;

        let xs = axis_steps(corner1.x, corner2.x);
        let ys = axis_steps(corner1.y, corner2.y);
        let zs = axis_steps(corner1.z, corner2.z);

        let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    points.push(SpatialPoint::new(x, y, z, room));
                }
            }
        }
        Ok(points)
    }
}

/// Reject a position with a NaN or infinite component
pub fn ensure_finite(position: &Vector3<f64>, owner: &str) -> PresenceResult<()> {
    if position.iter().all(|c| c.is_finite()) {
        return Ok(());
    }
    Err(PresenceError::NonFiniteCoordinate {
        owner: owner.to_string(),
        x: position.x,
        y: position.y,
        z: position.z,
    })
}

/// Check that a room volume has finite corners with `corner1 <= corner2` on every axis
pub fn validate_volume(
    corner1: &Vector3<f64>,
    corner2: &Vector3<f64>,
    room: &str,
) -> PresenceResult<()> {
    let owner = format!("room '{}'", room);
    ensure_finite(corner1, &owner)?;
    ensure_finite(corner2, &owner)?;

    for (axis, low, high) in [
        (Axis::X, corner1.x, corner2.x),
        (Axis::Y, corner1.y, corner2.y),
        (Axis::Z, corner1.z, corner2.z),
    ] {
        if low > high {
            return Err(PresenceError::InvertedCorners {
                room: room.to_string(),
                axis,
                low,
                high,
            });
        }
    }
    Ok(())
}

/// Values from `low` to `high` inclusive at lattice spacing
fn axis_steps(low: f64, high: f64) -> Vec<f64> {
    // Small epsilon so an exact upper corner is not lost to float error
    let count = ((high - low) / LATTICE_SPACING + 1e-9).floor() as usize + 1;
    (0..count).map(|i| low + i as f64 * LATTICE_SPACING).collect()
}
