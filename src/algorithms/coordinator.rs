//! Weighted nearest-neighbour voting over the candidate lattice
//!
//! The coordinator owns the anchors and the lattice of candidate points. Each
//! distance sample is rated by its anchor, ratings are summed per lattice point,
//! and the best supported points are mapped back to a room.

use crate::algorithms::anchor::Anchor;
use crate::core::constants::UNKNOWN_ROOM;
use crate::core::types::{CoordinateKey, SpatialPoint};
use crate::validation::error::{PresenceError, PresenceResult};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// How the set of winning points is chosen after sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinnerSelection {
    /// Top entry plus every entry with the same match count and summed rating
    #[default]
    Tied,
    /// Top entry plus every entry whose match count equals the top summed rating
    Legacy,
}

/// Per-point vote totals
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub coordinate_key: CoordinateKey,
    pub rating: f64,
    pub match_count: u32,
}

/// Owner of the anchors and the candidate lattice
#[derive(Debug, Default)]
pub struct Coordinator {
    lattice: Vec<SpatialPoint>,
    anchors: HashMap<String, Anchor>,
    /// Registration order, so initialization and diagnostics are deterministic
    anchor_order: Vec<String>,
    /// Lattice index of the first point registered under each key
    key_index: HashMap<CoordinateKey, usize>,
    selection: WinnerSelection,
    initialized: bool,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(selection: WinnerSelection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn selection(&self) -> WinnerSelection {
        self.selection
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn lattice(&self) -> &[SpatialPoint] {
        &self.lattice
    }

    pub fn lattice_len(&self) -> usize {
        self.lattice.len()
    }

    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.get(name)
    }

    pub fn anchor_names(&self) -> impl Iterator<Item = &str> {
        self.anchor_order.iter().map(String::as_str)
    }

    /// Distinct room names in lattice order
    pub fn room_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.lattice
            .iter()
            .map(SpatialPoint::room)
            .filter(|room| seen.insert(*room))
            .collect()
    }

    /// Append the lattice of a room volume. Overlapping volumes are not deduplicated.
    pub fn register_room_volume(
        &mut self,
        room: &str,
        corner1: &Vector3<f64>,
        corner2: &Vector3<f64>,
    ) -> PresenceResult<usize> {
        let points = SpatialPoint::generate_lattice(corner1, corner2, room)?;
        let added = points.len();
        self.lattice.extend(points);
        self.mark_stale();
        debug!(room, points = added, "Room volume registered");
        Ok(added)
    }

    pub fn register_anchor(&mut self, anchor: Anchor) -> PresenceResult<()> {
        let name = anchor.name().to_string();
        if self.anchors.contains_key(&name) {
            return Err(PresenceError::DuplicateAnchor { name });
        }
        debug!(anchor = %name, room = anchor.room(), "Anchor registered");
        self.anchor_order.push(name.clone());
        self.anchors.insert(name, anchor);
        self.mark_stale();
        Ok(())
    }

    fn mark_stale(&mut self) {
        if self.initialized {
            warn!("Registration after initialization; lookups are stale until re-initialized");
            self.initialized = false;
        }
    }

    /// Build every anchor's lookup table against the full lattice
    pub fn initialize(&mut self) {
        for name in &self.anchor_order {
            if let Some(anchor) = self.anchors.get_mut(name) {
                anchor.precompute(&self.lattice);
            }
        }

        self.key_index.clear();
        let mut overlapping = 0usize;
        for (slot, point) in self.lattice.iter().enumerate() {
            match self.key_index.entry(point.coordinate_key().to_string()) {
                Entry::Occupied(_) => overlapping += 1,
                Entry::Vacant(entry) => {
                    entry.insert(slot);
                }
            }
        }
        if overlapping > 0 {
            warn!(
                duplicates = overlapping,
                "Lattice points registered in more than one room; first registration wins"
            );
        }

        self.initialized = true;
        info!(
            anchors = self.anchors.len(),
            points = self.lattice.len(),
            "Coordinator initialized"
        );
    }

    /// First registered lattice point with the given key
    pub fn point(&self, key: &str) -> Option<&SpatialPoint> {
        self.key_index.get(key).map(|&slot| &self.lattice[slot])
    }

    /// Sum every anchor's ratings per lattice point, best supported first.
    ///
    /// Sorted by match count then summed rating, both descending; equal entries
    /// keep the order in which they were first rated.
    pub fn score_candidates(&self, samples: &[(String, f64)]) -> Vec<CandidateScore> {
        if !self.initialized {
            debug!("Resolve requested before initialization");
            return Vec::new();
        }

        let mut index: HashMap<CoordinateKey, usize> = HashMap::new();
        let mut scores: Vec<CandidateScore> = Vec::new();

        for (anchor_name, distance) in samples {
            let Some(anchor) = self.anchors.get(anchor_name) else {
                warn!(anchor = %anchor_name, "Sample from unknown anchor skipped");
                continue;
            };

            for candidate in anchor.rate(*distance) {
                match index.get(&candidate.coordinate_key) {
                    Some(&slot) => {
                        let score = &mut scores[slot];
                        score.rating += candidate.rating;
                        score.match_count += 1;
                    }
                    None => {
                        index.insert(candidate.coordinate_key.clone(), scores.len());
                        scores.push(CandidateScore {
                            coordinate_key: candidate.coordinate_key,
                            rating: candidate.rating,
                            match_count: 1,
                        });
                    }
                }
            }
        }

        scores.sort_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| b.rating.total_cmp(&a.rating))
        });
        scores
    }

    /// Coordinate keys of the best supported lattice points (possibly none)
    pub fn resolve_best_candidates(&self, samples: &[(String, f64)]) -> Vec<CoordinateKey> {
        let scores = self.score_candidates(samples);
        let Some(top) = scores.first() else {
            return Vec::new();
        };

        let winners: Vec<CoordinateKey> = std::iter::once(top)
            .chain(scores[1..].iter().filter(|entry| self.ties_with(top, entry)))
            .map(|entry| entry.coordinate_key.clone())
            .collect();

        debug!(
            candidates = scores.len(),
            winners = winners.len(),
            match_count = top.match_count,
            rating = top.rating,
            "Best candidates resolved"
        );
        winners
    }

    fn ties_with(&self, top: &CandidateScore, entry: &CandidateScore) -> bool {
        match self.selection {
            WinnerSelection::Tied => {
                entry.match_count == top.match_count && entry.rating == top.rating
            }
            WinnerSelection::Legacy => top.rating == f64::from(entry.match_count),
        }
    }

    /// Most likely room for a set of samples, or `"unknown"`
    pub fn resolve_room(&self, samples: &[(String, f64)]) -> String {
        let winners = self.resolve_best_candidates(samples);

        let matched: Vec<&SpatialPoint> = winners
            .iter()
            .filter_map(|key| self.point(key))
            .collect();

        match matched.as_slice() {
            [] => UNKNOWN_ROOM.to_string(),
            [single] => single.room().to_string(),
            many => most_frequent_room(many).to_string(),
        }
    }
}

/// Most frequent room among points; ties go to the room seen first
fn most_frequent_room<'a>(points: &[&'a SpatialPoint]) -> &'a str {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for &point in points {
        match tally.iter_mut().find(|(room, _)| *room == point.room()) {
            Some((_, count)) => *count += 1,
            None => tally.push((point.room(), 1)),
        }
    }

    let mut best = ("", 0usize);
    for (room, count) in tally {
        if count > best.1 {
            best = (room, count);
        }
    }
    best.0
}
