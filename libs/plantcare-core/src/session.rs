//! Care sessions and walkthrough ordering
//!
//! A care session is a transient overlay recording which care steps were ticked
//! off during one walkthrough. It is never persisted and never drives due-date
//! math; the store writes `last_completed` on the plant itself when a step is
//! marked.

use crate::models::{AppSettings, Plant, PlantLocation, Room, Zone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Completion overlay of one care walkthrough
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    completed: HashSet<(Uuid, Uuid)>,
}

impl CareSession {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            completed: HashSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Record a completed step; returns `false` if it was already recorded
    pub fn mark(&mut self, plant_id: Uuid, step_id: Uuid) -> bool {
        self.completed.insert((plant_id, step_id))
    }

    /// Forget a completed step; returns `false` if it was not recorded
    pub fn unmark(&mut self, plant_id: Uuid, step_id: Uuid) -> bool {
        self.completed.remove(&(plant_id, step_id))
    }

    #[must_use]
    pub fn is_completed(&self, plant_id: Uuid, step_id: Uuid) -> bool {
        self.completed.contains(&(plant_id, step_id))
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Number of steps of one plant ticked off in this session
    #[must_use]
    pub fn completed_for_plant(&self, plant_id: Uuid) -> usize {
        self.completed.iter().filter(|(p, _)| *p == plant_id).count()
    }

    /// Drop overlay entries whose plant or step no longer exists
    pub fn retain_existing(&mut self, plants: &[Plant]) {
        self.completed.retain(|(plant_id, step_id)| {
            plants
                .iter()
                .find(|p| p.id == *plant_id)
                .is_some_and(|p| p.care_step(*step_id).is_some())
        });
    }
}

/// Location visited at one stop of a care walkthrough
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalkthroughLocation {
    Room { id: Uuid, name: String },
    Zone { id: Uuid, name: String },
    Unassigned,
}

/// One stop of a care walkthrough with the plants needing care there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkthroughStop {
    pub location: WalkthroughLocation,
    pub plant_ids: Vec<Uuid>,
}

/// Order rooms for a walkthrough: the user's custom order first, then the rest
/// by display order
#[must_use]
pub fn walkthrough_room_order<'a>(rooms: &'a [Room], settings: &AppSettings) -> Vec<&'a Room> {
    let mut ordered: Vec<&Room> = settings
        .care_room_order
        .iter()
        .filter_map(|id| rooms.iter().find(|r| r.id == *id))
        .collect();
    let mut remaining: Vec<&Room> = rooms
        .iter()
        .filter(|r| !ordered.iter().any(|o| o.id == r.id))
        .collect();
    remaining.sort_by_key(|r| r.order_index);
    // Duplicate ids in the custom order only count once
    let mut seen = HashSet::new();
    ordered.retain(|r| seen.insert(r.id));
    ordered.extend(remaining);
    ordered
}

/// Group plants needing care into walkthrough stops
///
/// Rooms come first (custom order, then display order), then zones by display
/// order, then unassigned plants. Stops without plants are omitted.
#[must_use]
pub fn build_walkthrough(
    rooms: &[Room],
    zones: &[Zone],
    plants_needing_care: &[&Plant],
    settings: &AppSettings,
) -> Vec<WalkthroughStop> {
    let mut stops = Vec::new();

    for room in walkthrough_room_order(rooms, settings) {
        let plant_ids: Vec<Uuid> = plants_needing_care
            .iter()
            .filter(|p| matches!(p.location(), PlantLocation::Room { room_id, .. } if room_id == room.id))
            .map(|p| p.id)
            .collect();
        if !plant_ids.is_empty() {
            stops.push(WalkthroughStop {
                location: WalkthroughLocation::Room {
                    id: room.id,
                    name: room.name.clone(),
                },
                plant_ids,
            });
        }
    }

    let mut sorted_zones: Vec<&Zone> = zones.iter().collect();
    sorted_zones.sort_by_key(|z| z.order_index);
    for zone in sorted_zones {
        let plant_ids: Vec<Uuid> = plants_needing_care
            .iter()
            .filter(|p| matches!(p.location(), PlantLocation::Zone { zone_id } if zone_id == zone.id))
            .map(|p| p.id)
            .collect();
        if !plant_ids.is_empty() {
            stops.push(WalkthroughStop {
                location: WalkthroughLocation::Zone {
                    id: zone.id,
                    name: zone.name.clone(),
                },
                plant_ids,
            });
        }
    }

    let unassigned: Vec<Uuid> = plants_needing_care
        .iter()
        .filter(|p| p.location() == PlantLocation::Unassigned)
        .map(|p| p.id)
        .collect();
    if !unassigned.is_empty() {
        stops.push(WalkthroughStop {
            location: WalkthroughLocation::Unassigned,
            plant_ids: unassigned,
        });
    }

    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CareStep, CareStepType, CompassDirection, LightType, SunPeriod, WindExposure,
    };

    #[test]
    fn test_mark_and_unmark() {
        let mut session = CareSession::new(Utc::now());
        let plant = Uuid::new_v4();
        let step = Uuid::new_v4();

        assert!(session.mark(plant, step));
        assert!(!session.mark(plant, step));
        assert!(session.is_completed(plant, step));
        assert_eq!(session.completed_count(), 1);
        assert_eq!(session.completed_for_plant(plant), 1);

        assert!(session.unmark(plant, step));
        assert!(!session.unmark(plant, step));
        assert!(!session.is_completed(plant, step));
        assert_eq!(session.completed_count(), 0);
    }

    #[test]
    fn test_retain_existing_drops_missing_pairs() {
        let plant = Plant::new("Fern", LightType::Low).with_care_step(CareStep::new(
            CareStepType::Misting,
            "Mist",
            2,
        ));
        let step_id = plant.care_steps[0].id;
        let mut session = CareSession::new(Utc::now());
        session.mark(plant.id, step_id);
        session.mark(plant.id, Uuid::new_v4());
        session.mark(Uuid::new_v4(), step_id);

        session.retain_existing(std::slice::from_ref(&plant));
        assert_eq!(session.completed_count(), 1);
        assert!(session.is_completed(plant.id, step_id));
    }

    #[test]
    fn test_walkthrough_room_order_prefers_custom_order() {
        let mut a = Room::new("A", &[]);
        a.order_index = 0;
        let mut b = Room::new("B", &[]);
        b.order_index = 1;
        let mut c = Room::new("C", &[]);
        c.order_index = 2;
        let rooms = vec![a.clone(), b.clone(), c.clone()];

        let settings = AppSettings {
            care_room_order: vec![c.id, Uuid::new_v4(), c.id, a.id],
            ..AppSettings::default()
        };
        let names: Vec<&str> = walkthrough_room_order(&rooms, &settings)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_build_walkthrough_groups_by_location() {
        let room = Room::new("Kitchen", &[CompassDirection::North]);
        let zone = Zone::new(
            "Balcony",
            CompassDirection::South,
            SunPeriod::FullSun,
            WindExposure::Exposed,
        );
        let empty_room = Room::new("Attic", &[]);

        let mut herb = Plant::new("Basil", LightType::Direct);
        herb.assign_to_zone(zone.id);
        let mut pothos = Plant::new("Pothos", LightType::Low);
        pothos.assign_to_room(room.id, None);
        let loose = Plant::new("Cutting", LightType::Indirect);

        let needing = vec![&herb, &pothos, &loose];
        let stops = build_walkthrough(
            &[room.clone(), empty_room],
            std::slice::from_ref(&zone),
            &needing,
            &AppSettings::default(),
        );

        assert_eq!(stops.len(), 3);
        assert_eq!(
            stops[0].location,
            WalkthroughLocation::Room {
                id: room.id,
                name: "Kitchen".to_string()
            }
        );
        assert_eq!(stops[0].plant_ids, vec![pothos.id]);
        assert_eq!(stops[1].plant_ids, vec![herb.id]);
        assert_eq!(stops[2].location, WalkthroughLocation::Unassigned);
        assert_eq!(stops[2].plant_ids, vec![loose.id]);
    }
}
