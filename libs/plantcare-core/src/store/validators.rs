//! Entity validation and reference repair
//!
//! Validation runs before a mutation touches the collections, so a rejected
//! call leaves the store unchanged. Repair runs after deletions, loads and
//! restores so that every plant reference resolves at read time.

use crate::error::{PlantCareError, Result};
use crate::models::{AppSettings, Plant, Room, Zone};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reject blank names
///
/// # Errors
/// Returns a validation error if `name` is empty after trimming
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PlantCareError::validation(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(())
}

/// Validate a room on its own
///
/// # Errors
/// Returns a validation error for a blank name or duplicate window ids
pub fn validate_room(room: &Room) -> Result<()> {
    validate_name("Room", &room.name)?;
    let mut seen = HashSet::new();
    if room.windows.iter().any(|w| !seen.insert(w.id)) {
        return Err(PlantCareError::validation(format!(
            "Room {} has duplicate window ids",
            room.id
        )));
    }
    Ok(())
}

/// Validate a zone on its own
///
/// # Errors
/// Returns a validation error for a blank name or sun hours outside 0..=24
pub fn validate_zone(zone: &Zone) -> Result<()> {
    validate_name("Zone", &zone.name)?;
    if let Some(hours) = zone.sun_hours {
        if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
            return Err(PlantCareError::validation(format!(
                "Sun hours must be between 0 and 24, got {hours}"
            )));
        }
    }
    Ok(())
}

/// Validate a plant against the current rooms and zones
///
/// # Errors
/// Returns a validation error for a blank name, a non-positive frequency,
/// duplicate care step ids, a window without a room, or a plant placed in
/// both a room and a zone; returns `RoomNotFound`, `WindowNotFound` or
/// `ZoneNotFound` for references that do not resolve
pub fn validate_plant(plant: &Plant, rooms: &[Room], zones: &[Zone]) -> Result<()> {
    validate_name("Plant", &plant.name)?;

    let mut step_ids = HashSet::new();
    for step in &plant.care_steps {
        if step.frequency_days <= 0 {
            return Err(PlantCareError::validation(format!(
                "{} frequency must be at least one day, got {}",
                step.display_name(),
                step.frequency_days
            )));
        }
        if !step_ids.insert(step.id) {
            return Err(PlantCareError::validation(format!(
                "Plant {} has duplicate care step id {}",
                plant.name, step.id
            )));
        }
    }

    if plant.assigned_room_id.is_some() && plant.assigned_zone_id.is_some() {
        return Err(PlantCareError::validation(
            "A plant cannot be assigned to both a room and a zone",
        ));
    }

    if let Some(window_id) = plant.assigned_window_id {
        let room_id = plant.assigned_room_id.ok_or_else(|| {
            PlantCareError::validation("A window assignment requires a room assignment")
        })?;
        let room = find_room(rooms, room_id)?;
        if !room.has_window(window_id) {
            return Err(PlantCareError::WindowNotFound { id: window_id });
        }
    } else if let Some(room_id) = plant.assigned_room_id {
        find_room(rooms, room_id)?;
    }

    if let Some(zone_id) = plant.assigned_zone_id {
        if !zones.iter().any(|z| z.id == zone_id) {
            return Err(PlantCareError::ZoneNotFound { id: zone_id });
        }
    }

    Ok(())
}

/// Validate settings
///
/// # Errors
/// Returns a validation error if the reminder hour is not a valid hour of day
pub fn validate_settings(settings: &AppSettings) -> Result<()> {
    if settings.reminder_hour > 23 {
        return Err(PlantCareError::validation(format!(
            "Reminder hour must be between 0 and 23, got {}",
            settings.reminder_hour
        )));
    }
    Ok(())
}

fn find_room(rooms: &[Room], room_id: Uuid) -> Result<&Room> {
    rooms
        .iter()
        .find(|r| r.id == room_id)
        .ok_or(PlantCareError::RoomNotFound { id: room_id })
}

/// Clear every plant reference that does not resolve; returns the number of plants changed
///
/// A plant referencing both a room and a zone keeps the room.
pub fn repair_references(plants: &mut [Plant], rooms: &[Room], zones: &[Zone]) -> usize {
    let mut repaired = 0;
    for plant in plants.iter_mut() {
        let before = (
            plant.assigned_room_id,
            plant.assigned_window_id,
            plant.assigned_zone_id,
        );

        match plant.assigned_room_id {
            Some(room_id) => match rooms.iter().find(|r| r.id == room_id) {
                Some(room) => {
                    if let Some(window_id) = plant.assigned_window_id {
                        if !room.has_window(window_id) {
                            plant.assigned_window_id = None;
                        }
                    }
                }
                None => plant.clear_room_assignment(),
            },
            None => plant.assigned_window_id = None,
        }

        if let Some(zone_id) = plant.assigned_zone_id {
            if plant.assigned_room_id.is_some() || !zones.iter().any(|z| z.id == zone_id) {
                plant.assigned_zone_id = None;
            }
        }

        let after = (
            plant.assigned_room_id,
            plant.assigned_window_id,
            plant.assigned_zone_id,
        );
        if before != after {
            debug!("Repaired location references of plant {}", plant.id);
            repaired += 1;
        }
    }
    if repaired > 0 {
        warn!("Repaired dangling references on {} plants", repaired);
    }
    repaired
}
