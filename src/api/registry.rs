//! Bootstraps anchors from configuration and routes transport updates

use crate::algorithms::anchor::Anchor;
use crate::algorithms::coordinator::Coordinator;
use crate::api::adapter::{AnchorIngestionAdapter, UpdateOutcome};
use crate::api::callback::{DeviceRegistrar, NoopRegistrar, RoomChange, RoomChangeCallback};
use crate::core::types::SpatialPoint;
use crate::processing::entity::EntityStore;
use crate::processing::parser::PayloadParser;
use crate::utils::config::PresenceConfig;
use crate::validation::error::{PresenceError, PresenceResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Entry point for the transport layer: one adapter per configured anchor
pub struct AnchorRegistry {
    coordinator: Arc<Coordinator>,
    entities: EntityStore,
    adapters: HashMap<String, AnchorIngestionAdapter>,
    registrar: Box<dyn DeviceRegistrar>,
    room_observers: Vec<RoomChangeCallback>,
}

impl AnchorRegistry {
    /// Register every room volume and anchor, build the lookup tables and
    /// create one ingestion adapter per anchor name.
    pub fn initialize(config: &PresenceConfig) -> PresenceResult<Self> {
        config.validate()?;

        let mut coordinator = Coordinator::with_selection(config.winner_selection);
        for volume in &config.rooms {
            coordinator.register_room_volume(
                &volume.room,
                &volume.corner1.to_vector(),
                &volume.corner2.to_vector(),
            )?;
        }
        for anchor in &config.anchors {
            let position = SpatialPoint::new(anchor.x, anchor.y, anchor.z, anchor.room.as_str());
            coordinator.register_anchor(
                Anchor::new(anchor.name.as_str(), position).with_max_distance(anchor.max_distance),
            )?;
        }
        coordinator.initialize();

        let coordinator = Arc::new(coordinator);
        let entities = EntityStore::new();
        let parser = if config.lenient_payloads {
            PayloadParser::lenient()
        } else {
            PayloadParser::new()
        };

        let adapters = config
            .anchors
            .iter()
            .map(|anchor| {
                let adapter = AnchorIngestionAdapter::new(
                    anchor.name.as_str(),
                    anchor.room.as_str(),
                    Arc::clone(&coordinator),
                    entities.clone(),
                )
                .with_parser(parser.clone())
                .with_max_sample_age(config.max_sample_age());
                (anchor.name.clone(), adapter)
            })
            .collect::<HashMap<_, _>>();

        info!(
            anchors = adapters.len(),
            rooms = coordinator.room_names().len(),
            "Anchor registry initialized"
        );

        Ok(Self {
            coordinator,
            entities,
            adapters,
            registrar: Box::new(NoopRegistrar),
            room_observers: Vec::new(),
        })
    }

    pub fn with_registrar(mut self, registrar: Box<dyn DeviceRegistrar>) -> Self {
        self.registrar = registrar;
        self
    }

    pub fn add_room_change_observer(&mut self, observer: RoomChangeCallback) {
        self.room_observers.push(observer);
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn adapter(&self, anchor: &str) -> Option<&AnchorIngestionAdapter> {
        self.adapters.get(anchor)
    }

    pub fn adapter_mut(&mut self, anchor: &str) -> Option<&mut AnchorIngestionAdapter> {
        self.adapters.get_mut(anchor)
    }

    pub fn anchor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.ids()
    }

    /// Last room guessed for an entity, if it was ever sighted
    pub fn entity_room(&self, entity: &str) -> Option<String> {
        self.entities
            .with_entity(entity, |tracked| tracked.last_guessed_room().map(str::to_string))
            .flatten()
    }

    pub fn route_update(
        &mut self,
        anchor: &str,
        entity: &str,
        payload: &Value,
    ) -> PresenceResult<UpdateOutcome> {
        self.route_update_at(anchor, entity, payload, Instant::now())
    }

    /// Hand a raw payload to the adapter of the anchor that produced it
    pub fn route_update_at(
        &mut self,
        anchor: &str,
        entity: &str,
        payload: &Value,
        now: Instant,
    ) -> PresenceResult<UpdateOutcome> {
        let Some(adapter) = self.adapters.get_mut(anchor) else {
            warn!(anchor, entity, "Dropping update for unregistered anchor");
            return Err(PresenceError::UnknownAnchor {
                anchor: anchor.to_string(),
            });
        };

        let outcome = adapter.on_raw_update_at(entity, payload, now)?;

        if outcome.first_sighting {
            self.registrar.register_tracked_entity(entity, anchor);
        }

        if outcome.room_changed() {
            info!(
                entity,
                from = outcome.previous_room.as_deref().unwrap_or("-"),
                to = %outcome.room,
                "Entity changed room"
            );
            let change = RoomChange {
                entity: entity.to_string(),
                previous: outcome.previous_room.clone(),
                current: outcome.room.clone(),
            };
            for observer in self.room_observers.iter_mut() {
                observer(&change);
            }
        }

        Ok(outcome)
    }
}
