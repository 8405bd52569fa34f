//! Per-anchor ingestion endpoint
//!
//! An adapter receives the raw payloads one anchor produces, records them on
//! the tracked entity, refreshes the entity's room guess and notifies any
//! proximity subscribers whose trigger distance was crossed.

use crate::algorithms::coordinator::Coordinator;
use crate::api::callback::{ProximityCallback, SubscriptionHandle};
use crate::core::constants::DEFAULT_MAX_SAMPLE_AGE_SECS;
use crate::processing::entity::EntityStore;
use crate::processing::parser::PayloadParser;
use crate::validation::error::{PresenceError, PresenceResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Direction of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Entered,
    Left,
}

/// Compare consecutive readings against a trigger distance.
///
/// A missing previous reading never triggers. Losing the signal after any
/// reading counts as leaving.
pub fn detect_crossing(previous: Option<f64>, current: Option<f64>, trigger: f64) -> Option<Crossing> {
    let previous = previous?;
    match current {
        Some(distance) if previous >= trigger && distance < trigger => Some(Crossing::Entered),
        Some(distance) if previous < trigger && distance >= trigger => Some(Crossing::Left),
        None => Some(Crossing::Left),
        _ => None,
    }
}

struct ProximitySubscription {
    handle: SubscriptionHandle,
    trigger_distance: f64,
    callback: ProximityCallback,
}

/// Result of applying one raw update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub anchor: String,
    pub entity: String,
    pub distance: Option<f64>,
    pub room: String,
    pub previous_room: Option<String>,
    pub first_sighting: bool,
    pub crossings: usize,
}

impl UpdateOutcome {
    pub fn room_changed(&self) -> bool {
        self.previous_room.as_deref() != Some(self.room.as_str())
    }
}

/// Ingestion endpoint for one anchor
pub struct AnchorIngestionAdapter {
    anchor: String,
    room: String,
    coordinator: Arc<Coordinator>,
    entities: EntityStore,
    parser: PayloadParser,
    max_sample_age: Duration,
    subscriptions: HashMap<String, Vec<ProximitySubscription>>,
    handle_counter: u32,
}

impl fmt::Debug for AnchorIngestionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnchorIngestionAdapter")
            .field("anchor", &self.anchor)
            .field("room", &self.room)
            .field("max_sample_age", &self.max_sample_age)
            .field(
                "subscriptions",
                &self.subscriptions.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl AnchorIngestionAdapter {
    pub fn new(
        anchor: impl Into<String>,
        room: impl Into<String>,
        coordinator: Arc<Coordinator>,
        entities: EntityStore,
    ) -> Self {
        Self {
            anchor: anchor.into(),
            room: room.into(),
            coordinator,
            entities,
            parser: PayloadParser::new(),
            max_sample_age: Duration::from_secs(DEFAULT_MAX_SAMPLE_AGE_SECS),
            subscriptions: HashMap::new(),
            handle_counter: 0,
        }
    }

    pub fn with_parser(mut self, parser: PayloadParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_max_sample_age(mut self, max_sample_age: Duration) -> Self {
        self.max_sample_age = max_sample_age;
        self
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn on_raw_update(&mut self, entity: &str, payload: &Value) -> PresenceResult<UpdateOutcome> {
        self.on_raw_update_at(entity, payload, Instant::now())
    }

    /// Parse, record, re-guess the room, then fire proximity callbacks.
    ///
    /// A malformed payload leaves every entity untouched.
    pub fn on_raw_update_at(
        &mut self,
        entity: &str,
        payload: &Value,
        now: Instant,
    ) -> PresenceResult<UpdateOutcome> {
        let report = self.parser.parse(payload).map_err(|source| {
            warn!(anchor = %self.anchor, entity, error = %source, "Discarding malformed payload");
            PresenceError::MalformedPayload {
                anchor: self.anchor.clone(),
                entity: entity.to_string(),
                source,
            }
        })?;

        let anchor = self.anchor.as_str();
        let coordinator = &self.coordinator;
        let max_age = self.max_sample_age;
        let (previous_room, room, previous, current, first_sighting) =
            self.entities.upsert(entity, |tracked, created| {
                let previous_room = tracked.last_guessed_room().map(str::to_string);
                tracked.record_distance_at(anchor, report.distance, now);
                let (previous, current) = tracked
                    .sample(anchor)
                    .map(|s| (s.previous(), s.current()))
                    .unwrap_or((None, None));
                let room = tracked.guess_room_at(coordinator, max_age, now);
                (previous_room, room, previous, current, created)
            });

        debug!(
            anchor = %self.anchor,
            entity,
            distance = ?current,
            room = %room,
            "Update applied"
        );

        // Callbacks run after the store lock is released
        let mut crossings = 0;
        if let Some(subscriptions) = self.subscriptions.get_mut(entity) {
            for subscription in subscriptions.iter_mut() {
                let Some(crossing) = detect_crossing(previous, current, subscription.trigger_distance)
                else {
                    continue;
                };
                debug!(
                    anchor = %self.anchor,
                    entity,
                    trigger = subscription.trigger_distance,
                    ?crossing,
                    "Proximity threshold crossed"
                );
                (subscription.callback)(crossing == Crossing::Entered, current);
                crossings += 1;
            }
        }

        Ok(UpdateOutcome {
            anchor: self.anchor.clone(),
            entity: entity.to_string(),
            distance: current,
            room,
            previous_room,
            first_sighting,
            crossings,
        })
    }

    pub fn add_proximity_subscription(
        &mut self,
        entity: &str,
        trigger_distance: f64,
        callback: ProximityCallback,
    ) -> SubscriptionHandle {
        self.handle_counter += 1;
        let handle = SubscriptionHandle::new(self.handle_counter);
        self.subscriptions
            .entry(entity.to_string())
            .or_default()
            .push(ProximitySubscription {
                handle,
                trigger_distance,
                callback,
            });
        handle
    }

    /// Returns false when the handle is not registered on this adapter
    pub fn remove_proximity_subscription(&mut self, handle: SubscriptionHandle) -> bool {
        let mut removed = false;
        for subscriptions in self.subscriptions.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|s| s.handle != handle);
            removed |= subscriptions.len() != before;
        }
        self.subscriptions.retain(|_, subscriptions| !subscriptions.is_empty());
        removed
    }

    pub fn subscription_count(&self, entity: &str) -> usize {
        self.subscriptions.get(entity).map_or(0, Vec::len)
    }

    pub fn is_entity_within_distance(&self, entity: &str, max_distance: f64, max_age: Duration) -> bool {
        self.is_entity_within_distance_at(entity, max_distance, max_age, Instant::now())
    }

    /// True when this anchor holds a fresh reading for the entity no farther than `max_distance`
    pub fn is_entity_within_distance_at(
        &self,
        entity: &str,
        max_distance: f64,
        max_age: Duration,
        now: Instant,
    ) -> bool {
        self.entities
            .with_entity(entity, |tracked| {
                tracked
                    .sample(&self.anchor)
                    .filter(|sample| sample.is_fresh_at(max_age, now))
                    .and_then(|sample| sample.current())
                    .is_some_and(|distance| distance <= max_distance)
            })
            .unwrap_or(false)
    }
}
