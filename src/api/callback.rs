//! Callback types and collaborator seams for event-driven hosts
//!
//! Processing is synchronous: callbacks run on the thread that delivered the
//! update, after the update has been fully applied.

/// Proximity callback: `(entered, distance)`. `entered` is false when the
/// entity moved beyond the trigger distance or its signal was lost.
pub type ProximityCallback = Box<dyn FnMut(bool, Option<f64>) + Send>;

/// Room change callback
pub type RoomChangeCallback = Box<dyn FnMut(&RoomChange) + Send>;

/// Emitted when an entity's guessed room differs from the previous guess
#[derive(Debug, Clone, PartialEq)]
pub struct RoomChange {
    pub entity: String,
    pub previous: Option<String>,
    pub current: String,
}

/// Handle returned when registering a proximity subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u32);

impl SubscriptionHandle {
    pub(crate) fn new(id: u32) -> Self {
        SubscriptionHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Fire-and-forget hook announcing newly sighted entities as known devices.
///
/// Implementations own their failure handling; nothing is reported back.
pub trait DeviceRegistrar: Send {
    fn register_tracked_entity(&self, entity: &str, anchor: &str);
}

/// Registrar that discards announcements
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrar;

impl DeviceRegistrar for NoopRegistrar {
    fn register_tracked_entity(&self, _entity: &str, _anchor: &str) {}
}
