//! Mobile tags and their room guesses

use crate::algorithms::coordinator::Coordinator;
use crate::core::constants::DEFAULT_MAX_SAMPLE_AGE_SECS;
use crate::processing::sample::DistanceSample;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// A Bluetooth-tagged object whose room is being inferred
#[derive(Debug, Clone)]
pub struct TrackedEntity {
    id: String,
    /// Keyed by anchor name; ordered so resolution input is deterministic
    samples: BTreeMap<String, DistanceSample>,
    last_guessed_room: Option<String>,
}

impl TrackedEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            samples: BTreeMap::new(),
            last_guessed_room: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_guessed_room(&self) -> Option<&str> {
        self.last_guessed_room.as_deref()
    }

    pub fn sample(&self, anchor: &str) -> Option<&DistanceSample> {
        self.samples.get(anchor)
    }

    pub fn record_distance(&mut self, anchor: &str, distance: Option<f64>) {
        self.record_distance_at(anchor, distance, Instant::now());
    }

    /// Create the anchor's sample on first sighting, otherwise update it
    pub fn record_distance_at(&mut self, anchor: &str, distance: Option<f64>, now: Instant) {
        match self.samples.get_mut(anchor) {
            Some(sample) => sample.update_at(distance, now),
            None => {
                self.samples
                    .insert(anchor.to_string(), DistanceSample::new_at(distance, now));
            }
        }
    }

    /// Current distances from samples younger than `max_age`
    pub fn fresh_distances(&self, max_age: Duration) -> Vec<(String, f64)> {
        self.fresh_distances_at(max_age, Instant::now())
    }

    pub fn fresh_distances_at(&self, max_age: Duration, now: Instant) -> Vec<(String, f64)> {
        self.samples
            .iter()
            .filter(|(_, sample)| sample.is_fresh_at(max_age, now))
            .filter_map(|(anchor, sample)| sample.current().map(|d| (anchor.clone(), d)))
            .collect()
    }

    pub fn guess_room(&mut self, coordinator: &Coordinator) -> String {
        self.guess_room_at(
            coordinator,
            Duration::from_secs(DEFAULT_MAX_SAMPLE_AGE_SECS),
            Instant::now(),
        )
    }

    /// Resolve the room from fresh samples only and remember the result
    pub fn guess_room_at(
        &mut self,
        coordinator: &Coordinator,
        max_age: Duration,
        now: Instant,
    ) -> String {
        let distances = self.fresh_distances_at(max_age, now);
        let room = coordinator.resolve_room(&distances);
        debug!(
            entity = %self.id,
            samples = distances.len(),
            room = %room,
            "Room guessed"
        );
        self.last_guessed_room = Some(room.clone());
        room
    }
}

/// Shared table of tracked entities, keyed by entity name.
///
/// Every ingestion adapter holds a clone; entities are created lazily on first
/// sighting and live for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    inner: Arc<Mutex<HashMap<String, TrackedEntity>>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TrackedEntity>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the entity, creating it first if needed.
    /// The flag passed to `f` is true when the entity was just created.
    pub fn upsert<R>(&self, id: &str, f: impl FnOnce(&mut TrackedEntity, bool) -> R) -> R {
        let mut entities = self.lock();
        let created = !entities.contains_key(id);
        let entity = entities
            .entry(id.to_string())
            .or_insert_with(|| TrackedEntity::new(id));
        f(entity, created)
    }

    pub fn with_entity<R>(&self, id: &str, f: impl FnOnce(&TrackedEntity) -> R) -> Option<R> {
        self.lock().get(id).map(f)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::anchor::Anchor;
    use crate::core::constants::UNKNOWN_ROOM;
    use crate::core::types::SpatialPoint;
    use nalgebra::Vector3;

    fn two_room_coordinator() -> Coordinator {
        let mut coordinator = Coordinator::new();
        coordinator
            .register_room_volume("kitchen", &Vector3::new(0.0, 0.0, 0.0), &Vector3::new(4.5, 4.0, 2.0))
            .unwrap();
        coordinator
            .register_room_volume("lounge", &Vector3::new(5.0, 0.0, 0.0), &Vector3::new(9.0, 4.0, 2.0))
            .unwrap();
        coordinator
            .register_anchor(Anchor::new("fridge", SpatialPoint::new(0.0, 2.0, 1.0, "kitchen")))
            .unwrap();
        coordinator
            .register_anchor(Anchor::new("tv", SpatialPoint::new(9.0, 2.0, 1.0, "lounge")))
            .unwrap();
        coordinator.initialize();
        coordinator
    }

    #[test]
    fn test_record_distance_creates_then_updates() {
        let now = Instant::now();
        let mut entity = TrackedEntity::new("keys");
        entity.record_distance_at("fridge", Some(3.0), now);
        entity.record_distance_at("fridge", Some(2.0), now);

        let sample = entity.sample("fridge").unwrap();
        assert_eq!(sample.current(), Some(2.0));
        assert_eq!(sample.previous(), Some(3.0));
        assert!(entity.sample("tv").is_none());
    }

    #[test]
    fn test_guess_room_uses_fresh_samples() {
        let coordinator = two_room_coordinator();
        let now = Instant::now();
        let mut entity = TrackedEntity::new("keys");
        entity.record_distance_at("fridge", Some(1.0), now);
        entity.record_distance_at("tv", Some(8.0), now);

        let room = entity.guess_room_at(&coordinator, Duration::from_secs(120), now);
        assert_eq!(room, "kitchen");
        assert_eq!(entity.last_guessed_room(), Some("kitchen"));
    }

    #[test]
    fn test_stale_samples_resolve_to_unknown() {
        let coordinator = two_room_coordinator();
        let start = Instant::now();
        let mut entity = TrackedEntity::new("keys");
        entity.record_distance_at("fridge", Some(1.0), start);
        entity.record_distance_at("tv", Some(8.0), start);

        let later = start + Duration::from_secs(121);
        assert!(entity.fresh_distances_at(Duration::from_secs(120), later).is_empty());
        let room = entity.guess_room_at(&coordinator, Duration::from_secs(120), later);
        assert_eq!(room, UNKNOWN_ROOM);
        assert_eq!(entity.last_guessed_room(), Some(UNKNOWN_ROOM));
    }

    #[test]
    fn test_lost_signal_is_not_a_fresh_distance() {
        let now = Instant::now();
        let mut entity = TrackedEntity::new("keys");
        entity.record_distance_at("fridge", Some(1.0), now);
        entity.record_distance_at("tv", Some(8.0), now);
        entity.record_distance_at("tv", None, now);

        assert_eq!(
            entity.fresh_distances_at(Duration::from_secs(120), now),
            vec![("fridge".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_store_creates_entities_lazily() {
        let store = EntityStore::new();
        assert!(store.is_empty());

        let created = store.upsert("wallet", |entity, created| {
            entity.record_distance("hall", Some(2.0));
            created
        });
        assert!(created);
        let created = store.upsert("wallet", |_, created| created);
        assert!(!created);

        let clone = store.clone();
        assert!(clone.contains("wallet"));
        assert_eq!(clone.len(), 1);
        assert_eq!(
            clone.with_entity("wallet", |e| e.sample("hall").and_then(|s| s.current())),
            Some(Some(2.0))
        );
        assert!(clone.with_entity("phone", |_| ()).is_none());
    }
}
