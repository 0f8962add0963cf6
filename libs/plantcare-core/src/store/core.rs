//! Plant store: collections, mutations, persistence and care sessions

use super::migration::{decode_plants, encode_plants, PlantDecode};
use super::seed::default_dataset;
use super::validators::{
    repair_references, validate_plant, validate_room, validate_settings, validate_zone,
};
use super::StoreContents;
use crate::error::{PlantCareError, Result};
use crate::events::{EventBroadcaster, StoreEvent, StoreEventType};
use crate::models::{AppSettings, CareStep, Plant, PlantLocation, Room, Zone};
use crate::notifications::{sync_reminders, NotificationScheduler};
use crate::scheduler::{self, CareSummary, Clock};
use crate::session::{build_walkthrough, CareSession, WalkthroughStop};
use crate::storage::KeyValueStore;
use chrono::{DateTime, Local, Utc};
use plantcare_common::{LAST_BACKUP_KEY, PLANTS_KEY, ROOMS_KEY, SETTINGS_KEY, ZONES_KEY};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outcome of reading one persisted collection
enum Stored<T> {
    Found(T),
    Missing,
    Corrupt(PlantCareError),
}

fn read_json<T: DeserializeOwned>(storage: &dyn KeyValueStore, key: &str) -> Stored<T> {
    match storage.read_bytes(key) {
        None => Stored::Missing,
        Some(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => Stored::Found(value),
            Err(e) => Stored::Corrupt(e.into()),
        },
    }
}

fn found_or_seed<T>(stored: Stored<T>, key: &str, seed: T, rewrite: &mut bool) -> T {
    match stored {
        Stored::Found(value) => value,
        Stored::Missing => {
            info!("No saved {}, loading defaults", key);
            *rewrite = true;
            seed
        }
        Stored::Corrupt(e) => {
            warn!("Saved {} unreadable, loading defaults: {}", key, e);
            *rewrite = true;
            seed
        }
    }
}

fn next_order_index(indices: impl Iterator<Item = i32>) -> i32 {
    indices.max().map_or(0, |max| max.saturating_add(1))
}

fn position_to_index(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    if from >= items.len() {
        return Err(PlantCareError::validation(format!(
            "Cannot move position {from}: only {} entries",
            items.len()
        )));
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    Ok(())
}

/// Keep only room ids that exist, each once
fn prune_room_order(settings: &mut AppSettings, rooms: &[Room]) {
    let mut seen = HashSet::new();
    settings
        .care_room_order
        .retain(|id| rooms.iter().any(|r| r.id == *id) && seen.insert(*id));
}

/// Owner of all rooms, zones, plants and settings
///
/// Every mutation validates first, then updates memory, writes every
/// collection through the key-value storage, and emits a [`StoreEvent`].
/// Rooms and zones are kept sorted by `order_index`; plants keep insertion
/// order.
pub struct PlantStore {
    rooms: Vec<Room>,
    zones: Vec<Zone>,
    plants: Vec<Plant>,
    settings: AppSettings,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    events: EventBroadcaster,
    reminders: Option<Arc<dyn NotificationScheduler>>,
    /// Summary and hour last handed to the reminder scheduler
    last_reminder: Option<(CareSummary, u8)>,
    care_session: Option<CareSession>,
}

impl fmt::Debug for PlantStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlantStore")
            .field("rooms", &self.rooms.len())
            .field("zones", &self.zones.len())
            .field("plants", &self.plants.len())
            .field("settings", &self.settings)
            .field("care_session", &self.care_session.as_ref().map(CareSession::id))
            .finish_non_exhaustive()
    }
}

impl PlantStore {
    /// Create a store with no data that has not read from storage
    #[must_use]
    pub fn empty(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Vec::new(),
            zones: Vec::new(),
            plants: Vec::new(),
            settings: AppSettings::default(),
            storage,
            clock,
            events: EventBroadcaster::new(),
            reminders: None,
            last_reminder: None,
            care_session: None,
        }
    }

    /// Load every collection from storage
    ///
    /// Missing or unreadable collections are replaced by the default dataset,
    /// older plant data is migrated, and dangling references are repaired.
    /// Anything changed on the way in is written back in the current format.
    /// Loading never fails.
    #[instrument(skip_all)]
    pub fn load(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let mut store = Self::empty(storage, clock);
        let mut seed = default_dataset();
        let mut rewrite = false;

        let rooms = read_json::<Vec<Room>>(store.storage.as_ref(), ROOMS_KEY);
        store.rooms = found_or_seed(
            rooms,
            ROOMS_KEY,
            std::mem::take(&mut seed.rooms),
            &mut rewrite,
        );

        let zones = read_json::<Vec<Zone>>(store.storage.as_ref(), ZONES_KEY);
        store.zones = found_or_seed(
            zones,
            ZONES_KEY,
            std::mem::take(&mut seed.zones),
            &mut rewrite,
        );

        store.plants = match store.storage.read_bytes(PLANTS_KEY) {
            None => {
                info!("No saved plants, loading defaults");
                rewrite = true;
                std::mem::take(&mut seed.plants)
            }
            Some(bytes) => match decode_plants(&bytes) {
                PlantDecode::Current(plants) => plants,
                PlantDecode::Migrated { plants, .. } => {
                    rewrite = true;
                    plants
                }
                PlantDecode::Unreadable(e) => {
                    warn!("Saved plants unreadable, loading defaults: {}", e);
                    rewrite = true;
                    std::mem::take(&mut seed.plants)
                }
            },
        };

        store.settings = match read_json::<AppSettings>(store.storage.as_ref(), SETTINGS_KEY) {
            Stored::Found(settings) => settings,
            Stored::Missing => {
                rewrite = true;
                AppSettings::default()
            }
            Stored::Corrupt(e) => {
                warn!("Saved settings unreadable, using defaults: {}", e);
                rewrite = true;
                AppSettings::default()
            }
        };

        store.normalize();
        if repair_references(&mut store.plants, &store.rooms, &store.zones) > 0 {
            rewrite = true;
        }
        if rewrite {
            debug!("Rewriting collections in the current format");
            store.persist();
        }

        info!(
            rooms = store.rooms.len(),
            zones = store.zones.len(),
            plants = store.plants.len(),
            "Plant store loaded"
        );
        store
            .events
            .emit(StoreEventType::Loaded, store.clock.now());
        store
    }

    /// Attach the platform reminder scheduler and bring it up to date
    #[must_use]
    pub fn with_reminders(mut self, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        self.reminders = Some(scheduler);
        self.last_reminder = None;
        self.refresh_reminders();
        self
    }

    /// Subscribe to change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Current time from the store's clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn now_local(&self) -> DateTime<Local> {
        self.clock.now().with_timezone(&Local)
    }

    // Lookups

    /// Rooms in display order
    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Zones in display order
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Plants in insertion order
    #[must_use]
    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    #[must_use]
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    #[must_use]
    pub fn room(&self, room_id: Uuid) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    #[must_use]
    pub fn zone(&self, zone_id: Uuid) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }

    #[must_use]
    pub fn plant(&self, plant_id: Uuid) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == plant_id)
    }

    #[must_use]
    pub fn plants_in_room(&self, room_id: Uuid) -> Vec<&Plant> {
        self.plants
            .iter()
            .filter(|p| p.assigned_room_id == Some(room_id))
            .collect()
    }

    #[must_use]
    pub fn plants_in_zone(&self, zone_id: Uuid) -> Vec<&Plant> {
        self.plants
            .iter()
            .filter(|p| p.assigned_zone_id == Some(zone_id))
            .collect()
    }

    #[must_use]
    pub fn unassigned_plants(&self) -> Vec<&Plant> {
        self.plants
            .iter()
            .filter(|p| p.location() == PlantLocation::Unassigned)
            .collect()
    }

    // Rooms

    /// Add a room at the end of the display order
    ///
    /// # Errors
    /// Returns a validation error for a blank name, duplicate window ids or an
    /// id already in use
    #[instrument(skip(self, room), fields(room = %room.name))]
    pub fn add_room(&mut self, mut room: Room) -> Result<Uuid> {
        validate_room(&room)?;
        if self.room(room.id).is_some() {
            return Err(PlantCareError::validation(format!(
                "Room {} already exists",
                room.id
            )));
        }
        room.order_index = next_order_index(self.rooms.iter().map(|r| r.order_index));
        let room_id = room.id;
        self.rooms.push(room);
        self.commit(StoreEventType::RoomCreated { room_id });
        Ok(room_id)
    }

    /// Replace a room; plants at windows the room no longer has lose their window
    ///
    /// # Errors
    /// Returns `RoomNotFound` for an unknown room or a validation error
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn update_room(&mut self, room: Room) -> Result<()> {
        validate_room(&room)?;
        let index = self
            .rooms
            .iter()
            .position(|r| r.id == room.id)
            .ok_or(PlantCareError::RoomNotFound { id: room.id })?;
        let room_id = room.id;

        let removed_windows: Vec<Uuid> = self.rooms[index]
            .windows
            .iter()
            .filter(|w| !room.has_window(w.id))
            .map(|w| w.id)
            .collect();
        for plant in self
            .plants
            .iter_mut()
            .filter(|p| p.assigned_room_id == Some(room_id))
        {
            if plant
                .assigned_window_id
                .is_some_and(|w| removed_windows.contains(&w))
            {
                debug!("Plant {} lost its window", plant.name);
                plant.assigned_window_id = None;
            }
        }

        self.rooms[index] = room;
        self.normalize();
        self.commit(StoreEventType::RoomUpdated { room_id });
        Ok(())
    }

    /// Delete a room; its plants stay but lose their room and window
    ///
    /// # Errors
    /// Returns `RoomNotFound` for an unknown room
    #[instrument(skip(self))]
    pub fn delete_room(&mut self, room_id: Uuid) -> Result<Room> {
        let index = self
            .rooms
            .iter()
            .position(|r| r.id == room_id)
            .ok_or(PlantCareError::RoomNotFound { id: room_id })?;
        let room = self.rooms.remove(index);

        let mut unassigned = 0;
        for plant in self
            .plants
            .iter_mut()
            .filter(|p| p.assigned_room_id == Some(room_id))
        {
            plant.clear_room_assignment();
            unassigned += 1;
        }
        self.settings.care_room_order.retain(|id| *id != room_id);

        info!("Deleted room {} ({} plants unassigned)", room.name, unassigned);
        self.commit(StoreEventType::RoomDeleted { room_id });
        Ok(room)
    }

    /// Move the room at display position `from` to position `to` (clamped)
    ///
    /// # Errors
    /// Returns a validation error if `from` is out of range
    pub fn move_room(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.rooms, from, to)?;
        for (position, room) in self.rooms.iter_mut().enumerate() {
            room.order_index = position_to_index(position);
        }
        self.commit(StoreEventType::RoomsReordered);
        Ok(())
    }

    // Zones

    /// Add a zone at the end of the display order
    ///
    /// # Errors
    /// Returns a validation error for a blank name, invalid sun hours or an
    /// id already in use
    #[instrument(skip(self, zone), fields(zone = %zone.name))]
    pub fn add_zone(&mut self, mut zone: Zone) -> Result<Uuid> {
        validate_zone(&zone)?;
        if self.zone(zone.id).is_some() {
            return Err(PlantCareError::validation(format!(
                "Zone {} already exists",
                zone.id
            )));
        }
        zone.order_index = next_order_index(self.zones.iter().map(|z| z.order_index));
        let zone_id = zone.id;
        self.zones.push(zone);
        self.commit(StoreEventType::ZoneCreated { zone_id });
        Ok(zone_id)
    }

    /// Replace a zone
    ///
    /// # Errors
    /// Returns `ZoneNotFound` for an unknown zone or a validation error
    #[instrument(skip(self, zone), fields(zone_id = %zone.id))]
    pub fn update_zone(&mut self, zone: Zone) -> Result<()> {
        validate_zone(&zone)?;
        let index = self
            .zones
            .iter()
            .position(|z| z.id == zone.id)
            .ok_or(PlantCareError::ZoneNotFound { id: zone.id })?;
        let zone_id = zone.id;
        self.zones[index] = zone;
        self.normalize();
        self.commit(StoreEventType::ZoneUpdated { zone_id });
        Ok(())
    }

    /// Delete a zone; its plants stay but become unassigned
    ///
    /// # Errors
    /// Returns `ZoneNotFound` for an unknown zone
    #[instrument(skip(self))]
    pub fn delete_zone(&mut self, zone_id: Uuid) -> Result<Zone> {
        let index = self
            .zones
            .iter()
            .position(|z| z.id == zone_id)
            .ok_or(PlantCareError::ZoneNotFound { id: zone_id })?;
        let zone = self.zones.remove(index);

        let mut unassigned = 0;
        for plant in self
            .plants
            .iter_mut()
            .filter(|p| p.assigned_zone_id == Some(zone_id))
        {
            plant.assigned_zone_id = None;
            unassigned += 1;
        }

        info!("Deleted zone {} ({} plants unassigned)", zone.name, unassigned);
        self.commit(StoreEventType::ZoneDeleted { zone_id });
        Ok(zone)
    }

    /// Move the zone at display position `from` to position `to` (clamped)
    ///
    /// # Errors
    /// Returns a validation error if `from` is out of range
    pub fn move_zone(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.zones, from, to)?;
        for (position, zone) in self.zones.iter_mut().enumerate() {
            zone.order_index = position_to_index(position);
        }
        self.commit(StoreEventType::ZonesReordered);
        Ok(())
    }

    // Plants

    /// Add a plant
    ///
    /// # Errors
    /// Returns a validation or not-found error if the plant is invalid or
    /// references a missing room, window or zone
    #[instrument(skip(self, plant), fields(plant = %plant.name))]
    pub fn add_plant(&mut self, plant: Plant) -> Result<Uuid> {
        validate_plant(&plant, &self.rooms, &self.zones)?;
        if self.plant(plant.id).is_some() {
            return Err(PlantCareError::validation(format!(
                "Plant {} already exists",
                plant.id
            )));
        }
        let plant_id = plant.id;
        self.plants.push(plant);
        self.commit(StoreEventType::PlantCreated { plant_id });
        Ok(plant_id)
    }

    /// Replace a plant, keeping its position
    ///
    /// # Errors
    /// Returns `PlantNotFound` for an unknown plant, or a validation or
    /// not-found error as for [`PlantStore::add_plant`]
    #[instrument(skip(self, plant), fields(plant_id = %plant.id))]
    pub fn update_plant(&mut self, plant: Plant) -> Result<()> {
        validate_plant(&plant, &self.rooms, &self.zones)?;
        let index = self
            .plants
            .iter()
            .position(|p| p.id == plant.id)
            .ok_or(PlantCareError::PlantNotFound { id: plant.id })?;
        let plant_id = plant.id;
        self.plants[index] = plant;
        if let Some(session) = self.care_session.as_mut() {
            session.retain_existing(&self.plants);
        }
        self.commit(StoreEventType::PlantUpdated { plant_id });
        Ok(())
    }

    /// Delete a plant
    ///
    /// # Errors
    /// Returns `PlantNotFound` for an unknown plant
    #[instrument(skip(self))]
    pub fn delete_plant(&mut self, plant_id: Uuid) -> Result<Plant> {
        let index = self
            .plants
            .iter()
            .position(|p| p.id == plant_id)
            .ok_or(PlantCareError::PlantNotFound { id: plant_id })?;
        let plant = self.plants.remove(index);
        if let Some(session) = self.care_session.as_mut() {
            session.retain_existing(&self.plants);
        }
        info!("Deleted plant {}", plant.name);
        self.commit(StoreEventType::PlantDeleted { plant_id });
        Ok(plant)
    }

    // Settings

    /// Replace the settings; unknown rooms are dropped from the walkthrough order
    ///
    /// # Errors
    /// Returns a validation error for an invalid reminder hour
    pub fn update_settings(&mut self, mut settings: AppSettings) -> Result<()> {
        validate_settings(&settings)?;
        prune_room_order(&mut settings, &self.rooms);
        self.settings = settings;
        self.commit(StoreEventType::SettingsUpdated);
        // The reminder hour may have moved
        self.refresh_reminders();
        Ok(())
    }

    // Care schedule

    /// Overdue (plant, step) pairs in plant order then step order
    #[must_use]
    pub fn all_overdue_care_steps(&self) -> Vec<(&Plant, &CareStep)> {
        scheduler::overdue_care_steps(&self.plants, &self.now_local())
    }

    /// Due-today (plant, step) pairs in plant order then step order
    #[must_use]
    pub fn all_due_today_care_steps(&self) -> Vec<(&Plant, &CareStep)> {
        scheduler::due_today_care_steps(&self.plants, &self.now_local())
    }

    #[must_use]
    pub fn plants_needing_care(&self) -> Vec<&Plant> {
        scheduler::plants_needing_care(&self.plants, &self.now_local())
    }

    #[must_use]
    pub fn care_summary(&self) -> CareSummary {
        CareSummary::from_plants(&self.plants, &self.now_local())
    }

    /// Plants needing care grouped by location, in walkthrough order
    #[must_use]
    pub fn care_walkthrough(&self) -> Vec<WalkthroughStop> {
        let now = self.now_local();
        let needing_care = scheduler::plants_needing_care(&self.plants, &now);
        build_walkthrough(&self.rooms, &self.zones, &needing_care, &self.settings)
    }

    // Care sessions

    /// Start a care session, replacing any active one
    pub fn start_care_session(&mut self) -> Uuid {
        let now = self.clock.now();
        let session = CareSession::new(now);
        let session_id = session.id();
        if let Some(previous) = self.care_session.replace(session) {
            debug!("Replaced active care session {}", previous.id());
        }
        info!("Care session {} started", session_id);
        self.events
            .emit(StoreEventType::CareSessionStarted { session_id }, now);
        session_id
    }

    /// End the active care session; completion timestamps stay persisted
    pub fn end_care_session(&mut self) -> Option<CareSession> {
        let session = self.care_session.take()?;
        info!(
            "Care session {} ended with {} steps completed",
            session.id(),
            session.completed_count()
        );
        self.events.emit(
            StoreEventType::CareSessionEnded {
                session_id: session.id(),
            },
            self.clock.now(),
        );
        Some(session)
    }

    #[must_use]
    pub fn care_session(&self) -> Option<&CareSession> {
        self.care_session.as_ref()
    }

    #[must_use]
    pub fn is_completed_in_session(&self, plant_id: Uuid, step_id: Uuid) -> bool {
        self.care_session
            .as_ref()
            .is_some_and(|s| s.is_completed(plant_id, step_id))
    }

    /// Steps ticked off in the active session, 0 without one
    #[must_use]
    pub fn session_completed_count(&self) -> usize {
        self.care_session
            .as_ref()
            .map_or(0, CareSession::completed_count)
    }

    /// Record a care step as done now
    ///
    /// Sets the step's completion time and persists it. During a session the
    /// pair is also ticked off in the session.
    ///
    /// # Errors
    /// Returns `PlantNotFound` or `CareStepNotFound` if the pair does not exist
    #[instrument(skip(self))]
    pub fn mark_care_step_completed(&mut self, plant_id: Uuid, step_id: Uuid) -> Result<()> {
        let now = self.clock.now();
        let plant = self
            .plants
            .iter_mut()
            .find(|p| p.id == plant_id)
            .ok_or(PlantCareError::PlantNotFound { id: plant_id })?;
        let step = plant
            .care_step_mut(step_id)
            .ok_or(PlantCareError::CareStepNotFound { id: step_id })?;
        step.last_completed = Some(now);

        if let Some(session) = self.care_session.as_mut() {
            session.mark(plant_id, step_id);
        }
        self.commit(StoreEventType::CareStepCompleted {
            plant_id,
            care_step_id: step_id,
        });
        Ok(())
    }

    /// Untick a care step in the active session
    ///
    /// The persisted completion time is left as is. Returns whether the pair
    /// was ticked off.
    pub fn unmark_care_step_completed(&mut self, plant_id: Uuid, step_id: Uuid) -> bool {
        self.care_session
            .as_mut()
            .is_some_and(|s| s.unmark(plant_id, step_id))
    }

    // Backup support

    /// Copy of every persisted collection
    #[must_use]
    pub fn snapshot_contents(&self) -> StoreContents {
        StoreContents {
            rooms: self.rooms.clone(),
            zones: self.zones.clone(),
            plants: self.plants.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Replace every collection at once, repairing references, then persist
    #[instrument(skip_all)]
    pub fn replace_all(&mut self, contents: StoreContents) {
        let StoreContents {
            rooms,
            zones,
            plants,
            settings,
        } = contents;
        self.rooms = rooms;
        self.zones = zones;
        self.plants = plants;
        self.settings = settings;

        self.normalize();
        repair_references(&mut self.plants, &self.rooms, &self.zones);
        if let Some(session) = self.care_session.as_mut() {
            session.retain_existing(&self.plants);
        }
        info!(
            rooms = self.rooms.len(),
            zones = self.zones.len(),
            plants = self.plants.len(),
            "Store contents replaced"
        );
        self.commit(StoreEventType::Restored);
    }

    /// When the last successful backup was taken, if ever
    #[must_use]
    pub fn last_backup_date(&self) -> Option<DateTime<Utc>> {
        match read_json::<DateTime<Utc>>(self.storage.as_ref(), LAST_BACKUP_KEY) {
            Stored::Found(date) => Some(date),
            Stored::Missing => None,
            Stored::Corrupt(e) => {
                warn!("Ignoring unreadable last backup date: {}", e);
                None
            }
        }
    }

    /// Remember when a backup succeeded
    pub fn record_backup_date(&self, at: DateTime<Utc>) {
        self.write_json(LAST_BACKUP_KEY, &at);
    }

    // Internals

    fn normalize(&mut self) {
        self.rooms.sort_by_key(|r| r.order_index);
        self.zones.sort_by_key(|z| z.order_index);
        prune_room_order(&mut self.settings, &self.rooms);
    }

    fn commit(&mut self, event_type: StoreEventType) {
        self.persist();
        let schedule_changed = event_type.affects_care_schedule();
        self.events.emit(event_type, self.clock.now());
        if schedule_changed {
            self.refresh_reminders();
        }
    }

    fn persist(&self) {
        self.write_json(ROOMS_KEY, &self.rooms);
        self.write_json(ZONES_KEY, &self.zones);
        match encode_plants(&self.plants) {
            Ok(bytes) => self.write_bytes(PLANTS_KEY, &bytes),
            Err(e) => warn!("Failed to encode plants: {}", e),
        }
        self.write_json(SETTINGS_KEY, &self.settings);
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.write_bytes(key, &bytes),
            Err(e) => warn!("Failed to encode {}: {}", key, e),
        }
    }

    fn write_bytes(&self, key: &str, bytes: &[u8]) {
        if let Err(e) = self.storage.write_bytes(key, bytes) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }

    fn refresh_reminders(&mut self) {
        let Some(scheduler) = self.reminders.clone() else {
            return;
        };
        let current = (self.care_summary(), self.settings.reminder_hour);
        if self.last_reminder.as_ref() == Some(&current) {
            return;
        }
        sync_reminders(scheduler.as_ref(), &current.0, current.1);
        self.last_reminder = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareStepType, CompassDirection, LightType, SunPeriod, WindExposure};
    use crate::storage::MemoryKeyValueStore;
    use crate::test_utils::{
        create_test_store as empty_store, plant_with_step, FixedClock, RecordingScheduler,
        ReminderCall,
    };
    use chrono::Duration;

    fn zone(name: &str) -> Zone {
        Zone::new(
            name,
            CompassDirection::South,
            SunPeriod::FullSun,
            WindExposure::Moderate,
        )
    }

    #[test]
    fn test_add_room_assigns_next_order_index() {
        let (mut store, _, _) = empty_store();
        store.add_room(Room::new("Hall", &[])).unwrap();
        store.add_room(Room::new("Study", &[])).unwrap();

        let indices: Vec<i32> = store.rooms().iter().map(|r| r.order_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_rejected_mutation_leaves_state_untouched() {
        let (mut store, storage, _) = empty_store();
        let result = store.add_room(Room::new("  ", &[]));
        assert!(matches!(result, Err(PlantCareError::Validation { .. })));
        assert!(store.rooms().is_empty());
        assert!(!storage.contains_key(ROOMS_KEY));

        let mut plant = Plant::new("Fern", LightType::Low);
        plant.assign_to_room(Uuid::new_v4(), None);
        assert!(matches!(
            store.add_plant(plant),
            Err(PlantCareError::RoomNotFound { .. })
        ));
        assert!(store.plants().is_empty());
    }

    #[test]
    fn test_mutation_persists_every_collection() {
        let (mut store, storage, _) = empty_store();
        store.add_zone(zone("Patio")).unwrap();

        for key in [ROOMS_KEY, ZONES_KEY, PLANTS_KEY, SETTINGS_KEY] {
            assert!(storage.contains_key(key), "{key} not written");
        }
        let plants = storage.read_bytes(PLANTS_KEY).unwrap();
        assert!(matches!(decode_plants(&plants), PlantDecode::Current(_)));
    }

    #[test]
    fn test_update_room_clears_removed_window() {
        let (mut store, _, _) = empty_store();
        let room = Room::new("Lounge", &[CompassDirection::South, CompassDirection::West]);
        let south = room.windows[0].id;
        let west = room.windows[1].id;
        let room_id = store.add_room(room).unwrap();

        let mut at_south = Plant::new("A", LightType::Direct);
        at_south.assign_to_room(room_id, Some(south));
        let mut at_west = Plant::new("B", LightType::Direct);
        at_west.assign_to_room(room_id, Some(west));
        let a = store.add_plant(at_south).unwrap();
        let b = store.add_plant(at_west).unwrap();

        let mut updated = store.room(room_id).unwrap().clone();
        updated.windows.retain(|w| w.id != south);
        store.update_room(updated).unwrap();

        assert_eq!(store.plant(a).unwrap().assigned_room_id, Some(room_id));
        assert_eq!(store.plant(a).unwrap().assigned_window_id, None);
        assert_eq!(store.plant(b).unwrap().assigned_window_id, Some(west));
    }

    #[test]
    fn test_delete_room_unassigns_plants() {
        let (mut store, _, _) = empty_store();
        let room = Room::new("Office", &[CompassDirection::North]);
        let window = room.windows[0].id;
        let room_id = store.add_room(room).unwrap();
        let mut plant = Plant::new("Pothos", LightType::Low);
        plant.assign_to_room(room_id, Some(window));
        let plant_id = store.add_plant(plant).unwrap();

        let mut settings = store.settings().clone();
        settings.care_room_order = vec![room_id];
        store.update_settings(settings).unwrap();

        store.delete_room(room_id).unwrap();

        let plant = store.plant(plant_id).unwrap();
        assert_eq!(plant.location(), PlantLocation::Unassigned);
        assert!(store.settings().care_room_order.is_empty());
        assert!(matches!(
            store.delete_room(room_id),
            Err(PlantCareError::RoomNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_zone_unassigns_plants() {
        let (mut store, _, _) = empty_store();
        let zone_id = store.add_zone(zone("Garden")).unwrap();
        let mut plant = Plant::new("Rose", LightType::Direct);
        plant.assign_to_zone(zone_id);
        let plant_id = store.add_plant(plant).unwrap();

        store.delete_zone(zone_id).unwrap();
        assert_eq!(store.plant(plant_id).unwrap().assigned_zone_id, None);
        assert_eq!(store.plants().len(), 1);
    }

    #[test]
    fn test_move_room_renumbers() {
        let (mut store, _, _) = empty_store();
        for name in ["A", "B", "C"] {
            store.add_room(Room::new(name, &[])).unwrap();
        }
        store.move_room(0, 2).unwrap();
        let names: Vec<&str> = store.rooms().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);

        store.move_room(2, 99).unwrap();
        let indices: Vec<i32> = store.rooms().iter().map(|r| r.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        assert!(store.move_room(3, 0).is_err());
    }

    #[test]
    fn test_move_zone_renumbers() {
        let (mut store, _, _) = empty_store();
        for name in ["North bed", "South bed"] {
            store.add_zone(zone(name)).unwrap();
        }
        store.move_zone(1, 0).unwrap();
        assert_eq!(store.zones()[0].name, "South bed");
        assert_eq!(store.zones()[0].order_index, 0);
        assert_eq!(store.zones()[1].order_index, 1);
    }

    #[test]
    fn test_mark_and_unmark_in_session() {
        let (mut store, _, clock) = empty_store();
        let plant = plant_with_step("Fern", 3, None);
        let step_id = plant.care_steps[0].id;
        let plant_id = store.add_plant(plant).unwrap();

        store.start_care_session();
        store.mark_care_step_completed(plant_id, step_id).unwrap();
        assert!(store.is_completed_in_session(plant_id, step_id));
        assert_eq!(store.session_completed_count(), 1);

        assert!(store.unmark_care_step_completed(plant_id, step_id));
        assert!(!store.is_completed_in_session(plant_id, step_id));
        assert_eq!(
            store.plant(plant_id).unwrap().care_steps[0].last_completed,
            Some(clock.now())
        );

        let ended = store.end_care_session().unwrap();
        assert_eq!(ended.completed_count(), 0);
        assert!(store.care_session().is_none());
    }

    #[test]
    fn test_mark_unknown_pair() {
        let (mut store, _, _) = empty_store();
        let plant = plant_with_step("Fern", 3, None);
        let plant_id = store.add_plant(plant).unwrap();

        assert!(matches!(
            store.mark_care_step_completed(Uuid::new_v4(), Uuid::new_v4()),
            Err(PlantCareError::PlantNotFound { .. })
        ));
        assert!(matches!(
            store.mark_care_step_completed(plant_id, Uuid::new_v4()),
            Err(PlantCareError::CareStepNotFound { .. })
        ));
    }

    #[test]
    fn test_mark_outside_session_only_sets_timestamp() {
        let (mut store, _, _) = empty_store();
        let plant = plant_with_step("Fern", 3, None);
        let step_id = plant.care_steps[0].id;
        let plant_id = store.add_plant(plant).unwrap();

        store.mark_care_step_completed(plant_id, step_id).unwrap();
        assert!(store.care_session().is_none());
        assert!(!store.unmark_care_step_completed(plant_id, step_id));
        assert!(store.all_overdue_care_steps().is_empty());
    }

    #[test]
    fn test_aggregates_follow_clock() {
        let (mut store, _, clock) = empty_store();
        let done_yesterday = clock.now() - Duration::days(1);
        store
            .add_plant(plant_with_step("Daily", 1, Some(done_yesterday)))
            .unwrap();
        store
            .add_plant(plant_with_step("Weekly", 7, Some(clock.now())))
            .unwrap();
        store.add_plant(Plant::new("No steps", LightType::Low)).unwrap();

        assert_eq!(store.all_overdue_care_steps().len(), 1);
        assert_eq!(store.plants_needing_care().len(), 1);

        clock.advance(Duration::days(7));
        assert_eq!(store.plants_needing_care().len(), 2);
        assert_eq!(store.care_summary().plants.len(), 2);
    }

    #[test]
    fn test_reminders_synced_only_on_change() {
        let (store, _, _) = empty_store();
        let reminders = Arc::new(RecordingScheduler::new());
        let mut store = store.with_reminders(reminders.clone());
        assert_eq!(reminders.calls(), vec![ReminderCall::Cancelled]);

        let plant = plant_with_step("Fern", 3, None);
        let step_id = plant.care_steps[0].id;
        let plant_id = store.add_plant(plant).unwrap();
        store.add_room(Room::new("Hall", &[])).unwrap();
        store.mark_care_step_completed(plant_id, step_id).unwrap();

        let calls = reminders.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(
            &calls[1],
            ReminderCall::Scheduled { count: 1, hour: 9, .. }
        ));
        assert_eq!(calls[2], ReminderCall::Cancelled);
    }

    #[test]
    fn test_settings_hour_change_reschedules() {
        let (mut store, _, _) = empty_store();
        store.add_plant(plant_with_step("Fern", 3, None)).unwrap();
        let reminders = Arc::new(RecordingScheduler::new());
        let mut store = store.with_reminders(reminders.clone());

        let mut settings = store.settings().clone();
        settings.reminder_hour = 20;
        store.update_settings(settings).unwrap();

        assert!(matches!(
            reminders.calls().last(),
            Some(ReminderCall::Scheduled { hour: 20, .. })
        ));
    }

    #[test]
    fn test_load_seeds_empty_storage() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let store = PlantStore::load(storage.clone(), Arc::new(FixedClock::local_noon()));

        assert_eq!(store.rooms().len(), 3);
        assert_eq!(store.plants().len(), 4);
        assert!(storage.contains_key(PLANTS_KEY));
    }

    #[test]
    fn test_load_roundtrips_persisted_data() {
        let (mut store, storage, clock) = empty_store();
        let room_id = store.add_room(Room::new("Hall", &[])).unwrap();
        let mut plant = Plant::new("Fern", LightType::Low);
        plant.assign_to_room(room_id, None);
        store.add_plant(plant).unwrap();

        let reloaded = PlantStore::load(storage, clock);
        assert_eq!(reloaded.rooms(), store.rooms());
        assert_eq!(reloaded.plants(), store.plants());
        assert!(reloaded.zones().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_emit_events() {
        let (mut store, _, _) = empty_store();
        let mut events = store.subscribe();

        let room_id = store.add_room(Room::new("Hall", &[])).unwrap();
        store.start_care_session();

        assert_eq!(
            events.recv().await.unwrap().event_type,
            StoreEventType::RoomCreated { room_id }
        );
        assert!(matches!(
            events.recv().await.unwrap().event_type,
            StoreEventType::CareSessionStarted { .. }
        ));
    }

    #[test]
    fn test_replace_all_repairs_references() {
        let (mut store, _, _) = empty_store();
        let mut orphan = Plant::new("Orphan", LightType::Low)
            .with_care_step(CareStep::new(CareStepType::Watering, "Water", 4));
        orphan.assign_to_room(Uuid::new_v4(), None);

        store.replace_all(StoreContents {
            plants: vec![orphan],
            ..StoreContents::default()
        });
        assert_eq!(store.plants()[0].location(), PlantLocation::Unassigned);
    }

    #[test]
    fn test_last_backup_date_roundtrip() {
        let (store, _, clock) = empty_store();
        assert!(store.last_backup_date().is_none());
        store.record_backup_date(clock.now());
        assert_eq!(store.last_backup_date(), Some(clock.now()));
    }
}
