use crate::algorithms::coordinator::WinnerSelection;
use crate::core::constants::{DEFAULT_MAX_DISTANCE, DEFAULT_MAX_SAMPLE_AGE_SECS};
use crate::core::types::{ensure_finite, validate_volume};
use crate::validation::error::{PresenceError, PresenceResult};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Corner of a room volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Corner {
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Axis-aligned room volume; `corner1` must be componentwise <= `corner2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomVolumeConfig {
    pub room: String,
    pub corner1: Corner,
    pub corner2: Corner,
}

/// Individual anchor configuration. All three coordinates are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Unique anchor name, also the routing key for transport updates
    pub name: String,
    /// Room the anchor is installed in
    pub room: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Lattice points farther than this are never rated by the anchor
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

/// Complete room-presence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default)]
    pub rooms: Vec<RoomVolumeConfig>,
    #[serde(default)]
    pub anchors: Vec<AnchorConfig>,
    /// Samples older than this are ignored when guessing rooms (seconds)
    #[serde(default = "default_max_sample_age_secs")]
    pub max_sample_age_secs: u64,
    #[serde(default)]
    pub winner_selection: WinnerSelection,
    /// Accept distances sent as numeric strings
    #[serde(default)]
    pub lenient_payloads: bool,
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE
}

fn default_max_sample_age_secs() -> u64 {
    DEFAULT_MAX_SAMPLE_AGE_SECS
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            anchors: Vec::new(),
            max_sample_age_secs: DEFAULT_MAX_SAMPLE_AGE_SECS,
            winner_selection: WinnerSelection::default(),
            lenient_payloads: false,
        }
    }
}

impl PresenceConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PresenceResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| PresenceError::ConfigIo {
            path: path_str,
            message: e.to_string(),
        })?;

        let config = Self::from_json_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration without validating it
    pub fn from_json_str(content: &str) -> PresenceResult<Self> {
        serde_json::from_str(content).map_err(|e| PresenceError::ConfigFormat {
            message: e.to_string(),
        })
    }

    pub fn max_sample_age(&self) -> Duration {
        Duration::from_secs(self.max_sample_age_secs)
    }

    /// Reject configurations that would fail or silently misbehave at registration
    pub fn validate(&self) -> PresenceResult<()> {
        if self.max_sample_age_secs == 0 {
            return Err(PresenceError::InvalidParameter {
                parameter: "max_sample_age_secs".to_string(),
                value: "0".to_string(),
                reason: "every sample would be stale".to_string(),
            });
        }

        for volume in &self.rooms {
            validate_volume(&volume.corner1.to_vector(), &volume.corner2.to_vector(), &volume.room)?;
        }

        let rooms: HashSet<&str> = self.rooms.iter().map(|r| r.room.as_str()).collect();
        let mut names = HashSet::new();
        for anchor in &self.anchors {
            if !names.insert(anchor.name.as_str()) {
                return Err(PresenceError::DuplicateAnchor {
                    name: anchor.name.clone(),
                });
            }
            ensure_finite(
                &Vector3::new(anchor.x, anchor.y, anchor.z),
                &format!("anchor '{}'", anchor.name),
            )?;
            if !anchor.max_distance.is_finite() || anchor.max_distance <= 0.0 {
                return Err(PresenceError::InvalidMaxDistance {
                    name: anchor.name.clone(),
                    value: anchor.max_distance,
                });
            }
            if !rooms.contains(anchor.room.as_str()) {
                warn!(anchor = %anchor.name, room = %anchor.room, "Anchor room has no registered volume");
            }
        }

        if self.anchors.is_empty() {
            warn!("No anchors configured; every entity will resolve to unknown");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SpatialPoint;
    use crate::validation::error::Axis;
    use std::io::Write;

    const MINIMAL: &str = r#"
    {
      "rooms": [
        { "room": "office", "corner1": {"x": 0, "y": 0, "z": 0}, "corner2": {"x": 4, "y": 4, "z": 2.5} }
      ],
      "anchors": [
        { "name": "desk", "room": "office", "x": 1, "y": 1, "z": 1 }
      ]
    }
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.anchors[0].max_distance, 8.0);
        assert_eq!(config.max_sample_age(), Duration::from_secs(120));
        assert_eq!(config.winner_selection, WinnerSelection::Tied);
        assert!(!config.lenient_payloads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_winner_selection_parsed() {
        let json = r#"{ "winner_selection": "legacy" }"#;
        let config = PresenceConfig::from_json_str(json).unwrap();
        assert_eq!(config.winner_selection, WinnerSelection::Legacy);
    }

    #[test]
    fn test_anchor_coordinates_are_required() {
        let json = r#"{ "anchors": [ { "name": "desk", "room": "office" } ] }"#;
        assert!(matches!(
            PresenceConfig::from_json_str(json),
            Err(PresenceError::ConfigFormat { .. })
        ));
    }

    #[test]
    fn test_inverted_corners_rejected() {
        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        config.rooms[0].corner2.z = -1.0;
        assert!(matches!(
            config.validate(),
            Err(PresenceError::InvertedCorners { axis: Axis::Z, .. })
        ));
    }

    #[test]
    fn test_validation_matches_lattice_generation() {
        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        config.rooms[0].corner1.y = f64::NAN;
        let volume = &config.rooms[0];
        let from_lattice = SpatialPoint::generate_lattice(
            &volume.corner1.to_vector(),
            &volume.corner2.to_vector(),
            &volume.room,
        )
        .unwrap_err();
        assert!(matches!(
            config.validate(),
            Err(PresenceError::NonFiniteCoordinate { ref owner, .. }) if owner == "room 'office'"
        ));
        assert!(matches!(
            from_lattice,
            PresenceError::NonFiniteCoordinate { ref owner, .. } if owner == "room 'office'"
        ));
    }

    #[test]
    fn test_duplicate_anchor_rejected() {
        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        let duplicate = config.anchors[0].clone();
        config.anchors.push(duplicate);
        assert_eq!(
            config.validate(),
            Err(PresenceError::DuplicateAnchor { name: "desk".to_string() })
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        config.anchors[0].max_distance = 0.0;
        assert!(matches!(
            config.validate(),
            Err(PresenceError::InvalidMaxDistance { .. })
        ));
        config.anchors[0].max_distance = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(PresenceError::InvalidMaxDistance { .. })
        ));

        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        config.anchors[0].x = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(PresenceError::NonFiniteCoordinate { .. })
        ));

        let mut config = PresenceConfig::from_json_str(MINIMAL).unwrap();
        config.max_sample_age_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(PresenceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = PresenceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.rooms.len(), 1);
        assert_eq!(config.anchors[0].name, "desk");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PresenceConfig::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(PresenceError::ConfigIo { .. })));
    }
}
