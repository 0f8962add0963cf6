//! Change events emitted by the data store after each successful mutation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Default buffer of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Kinds of store changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event_type")]
pub enum StoreEventType {
    /// Collections loaded at startup
    Loaded,
    /// Collections replaced from a backup snapshot
    Restored,

    RoomCreated { room_id: Uuid },
    RoomUpdated { room_id: Uuid },
    RoomDeleted { room_id: Uuid },
    RoomsReordered,

    ZoneCreated { zone_id: Uuid },
    ZoneUpdated { zone_id: Uuid },
    ZoneDeleted { zone_id: Uuid },
    ZonesReordered,

    PlantCreated { plant_id: Uuid },
    PlantUpdated { plant_id: Uuid },
    PlantDeleted { plant_id: Uuid },
    CareStepCompleted { plant_id: Uuid, care_step_id: Uuid },

    SettingsUpdated,

    CareSessionStarted { session_id: Uuid },
    CareSessionEnded { session_id: Uuid },
}

impl StoreEventType {
    /// The room, zone or plant the event is about, if any
    #[must_use]
    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            Self::RoomCreated { room_id }
            | Self::RoomUpdated { room_id }
            | Self::RoomDeleted { room_id } => Some(*room_id),
            Self::ZoneCreated { zone_id }
            | Self::ZoneUpdated { zone_id }
            | Self::ZoneDeleted { zone_id } => Some(*zone_id),
            Self::PlantCreated { plant_id }
            | Self::PlantUpdated { plant_id }
            | Self::PlantDeleted { plant_id }
            | Self::CareStepCompleted { plant_id, .. } => Some(*plant_id),
            Self::CareSessionStarted { session_id } | Self::CareSessionEnded { session_id } => {
                Some(*session_id)
            }
            Self::Loaded
            | Self::Restored
            | Self::RoomsReordered
            | Self::ZonesReordered
            | Self::SettingsUpdated => None,
        }
    }

    /// Whether the event can change which care steps are due
    #[must_use]
    pub fn affects_care_schedule(&self) -> bool {
        matches!(
            self,
            Self::Loaded
                | Self::Restored
                | Self::PlantCreated { .. }
                | Self::PlantUpdated { .. }
                | Self::PlantDeleted { .. }
                | Self::CareStepCompleted { .. }
        )
    }
}

/// A store change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub id: Uuid,
    pub event_type: StoreEventType,
    pub timestamp: DateTime<Utc>,
}

/// Fan-out of store events to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Broadcast an event; having no subscribers is not an error
    pub fn emit(&self, event_type: StoreEventType, timestamp: DateTime<Utc>) {
        let event = StoreEvent {
            id: Uuid::new_v4(),
            event_type,
            timestamp,
        };
        if self.sender.send(event).is_err() {
            trace!("Store event dropped: no subscribers");
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
