//! Fixed receivers and their precomputed distance buckets

use crate::core::constants::{BUCKET_RATINGS, DEFAULT_MAX_DISTANCE, MAX_BUCKET_REACH};
use crate::core::types::{to_steps, CoordinateKey, SpatialPoint};
use std::collections::HashMap;
use tracing::debug;

/// A candidate lattice point with the confidence one measurement gives it
#[derive(Debug, Clone, PartialEq)]
pub struct RatedCandidate {
    pub coordinate_key: CoordinateKey,
    pub rating: f64,
}

/// Fixed receiver at a known position
#[derive(Debug, Clone)]
pub struct Anchor {
    name: String,
    position: SpatialPoint,
    max_distance: f64,
    /// Quantized distance (in lattice steps) to the keys of every point at that distance
    buckets: HashMap<i64, Vec<CoordinateKey>>,
    precomputed: bool,
}

impl Anchor {
    pub fn new(name: impl Into<String>, position: SpatialPoint) -> Self {
        Self {
            name: name.into(),
            position,
            max_distance: DEFAULT_MAX_DISTANCE,
            buckets: HashMap::new(),
            precomputed: false,
        }
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &SpatialPoint {
        &self.position
    }

    pub fn room(&self) -> &str {
        self.position.room()
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn is_precomputed(&self) -> bool {
        self.precomputed
    }

    /// Number of non-empty distance buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket every lattice point within range by its quantized distance.
    ///
    /// Replaces any previous table so a re-run after new registrations starts clean.
    pub fn precompute(&mut self, lattice: &[SpatialPoint]) {
        self.buckets.clear();
        let mut in_range = 0usize;
        for point in lattice {
            let distance = self.position.quantized_distance(point);
            if distance <= self.max_distance {
                self.buckets
                    .entry(to_steps(distance))
                    .or_default()
                    .push(point.coordinate_key().to_string());
                in_range += 1;
            }
        }
        self.precomputed = true;
        debug!(
            anchor = %self.name,
            points = in_range,
            buckets = self.buckets.len(),
            "Anchor lookup table built"
        );
    }

    /// Rate every bucketed point near a measured distance.
    ///
    /// A key present in several neighbouring buckets yields one entry per bucket.
    /// Distances that are not finite, or too far for any bucket to match, rate nothing.
    pub fn rate(&self, raw_distance: f64) -> Vec<RatedCandidate> {
        if !raw_distance.is_finite() || raw_distance > self.max_distance + MAX_BUCKET_REACH {
            return Vec::new();
        }
        let center = to_steps(raw_distance);
        let mut candidates = Vec::new();
        for (offset, rating) in BUCKET_RATINGS {
            let Some(step) = center.checked_add(offset) else {
                continue;
            };
            if let Some(keys) = self.buckets.get(&step) {
                candidates.extend(keys.iter().map(|key| RatedCandidate {
                    coordinate_key: key.clone(),
                    rating,
                }));
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn small_lattice() -> Vec<SpatialPoint> {
        SpatialPoint::generate_lattice(
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(4.0, 4.0, 2.0),
            "office",
        )
        .unwrap()
    }

    #[test]
    fn test_default_max_distance() {
        let anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        assert_eq!(anchor.max_distance(), 8.0);
        assert_eq!(anchor.room(), "office");
        assert!(!anchor.is_precomputed());
    }

    #[test]
    fn test_precompute_respects_max_distance() {
        let lattice = small_lattice();
        let mut anchor =
            Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office")).with_max_distance(1.0);
        anchor.precompute(&lattice);
        assert!(anchor.is_precomputed());
        // Buckets for 0, 0.5 and 1.0
        assert_eq!(anchor.bucket_count(), 3);
        assert!(anchor.rate(5.0).is_empty());
    }

    #[test]
    fn test_rate_weights_by_offset() {
        let lattice = small_lattice();
        let mut anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        anchor.precompute(&lattice);

        let rated = anchor.rate(2.0);
        let rating_of = |key: &str| {
            rated
                .iter()
                .filter(|c| c.coordinate_key == key)
                .map(|c| c.rating)
                .collect::<Vec<_>>()
        };
        assert_eq!(rating_of("2:0:0"), vec![100.0]);
        assert_eq!(rating_of("2.5:0:0"), vec![30.0]);
        assert_eq!(rating_of("1.5:0:0"), vec![30.0]);
        assert_eq!(rating_of("3:0:0"), vec![15.0]);
        assert_eq!(rating_of("1:0:0"), vec![15.0]);
        assert_eq!(rating_of("3.5:0:0"), vec![7.5]);
        assert_eq!(rating_of("0.5:0:0"), vec![7.5]);
        assert!(rating_of("4:0:0").is_empty());
        assert!(rated
            .iter()
            .all(|c| [100.0, 30.0, 15.0, 7.5].contains(&c.rating)));
    }

    #[test]
    fn test_rate_rounds_raw_distance() {
        let lattice = small_lattice();
        let mut anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        anchor.precompute(&lattice);
        assert_eq!(anchor.rate(1.9), anchor.rate(2.1));
    }

    #[test]
    fn test_rate_before_precompute_is_empty() {
        let anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        assert!(anchor.rate(1.0).is_empty());
    }

    #[test]
    fn test_rate_out_of_range_distances() {
        let lattice = small_lattice();
        let mut anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        anchor.precompute(&lattice);
        for distance in [1e300, f64::MAX, f64::INFINITY, f64::NAN, 9.5e18] {
            assert!(anchor.rate(distance).is_empty(), "distance {}", distance);
        }

        let unbounded = Anchor::new("hall", SpatialPoint::new(0.0, 0.0, 0.0, "office"))
            .with_max_distance(f64::MAX);
        assert!(unbounded.rate(f64::MAX).is_empty());
        assert!(unbounded.rate(-f64::MAX).is_empty());
    }

    #[test]
    fn test_duplicate_lattice_entries_are_kept() {
        let mut lattice = small_lattice();
        lattice.push(SpatialPoint::new(1.0, 0.0, 0.0, "closet"));
        let mut anchor = Anchor::new("desk", SpatialPoint::new(0.0, 0.0, 0.0, "office"));
        anchor.precompute(&lattice);
        let hits = anchor
            .rate(1.0)
            .into_iter()
            .filter(|c| c.coordinate_key == "1:0:0" && c.rating == 100.0)
            .count();
        assert_eq!(hits, 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_exact_distance_rates_point_at_full_confidence(
                ax in -2.0..6.0_f64,
                ay in -2.0..6.0_f64,
                az in -1.0..3.0_f64,
                index in 0usize..405,
            ) {
                let lattice = small_lattice();
                let point = &lattice[index % lattice.len()];
                let mut anchor = Anchor::new("sensor", SpatialPoint::new(ax, ay, az, "office"))
                    .with_max_distance(6.0);
                anchor.precompute(&lattice);

                prop_assume!(anchor.position().quantized_distance(point) <= anchor.max_distance());
                let exact = anchor.position().euclidean_distance(point);
                let rated = anchor.rate(exact);
                prop_assert!(rated
                    .iter()
                    .any(|c| c.coordinate_key == point.coordinate_key() && c.rating == 100.0));
            }
        }
    }
}
