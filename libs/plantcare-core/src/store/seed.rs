//! Built-in dataset loaded on first launch

use super::StoreContents;
use crate::models::{
    AppSettings, CareStep, CareStepType, CompassDirection, HumidityLevel, LightType, Plant, Room,
    SunPeriod, WindExposure, Zone,
};

/// Sample home used when nothing has been persisted yet
#[must_use]
pub fn default_dataset() -> StoreContents {
    let mut living_room = Room::new(
        "Living Room",
        &[CompassDirection::South, CompassDirection::West],
    );
    living_room.order_index = 0;
    let mut bedroom = Room::new("Bedroom", &[CompassDirection::East]);
    bedroom.order_index = 1;
    let mut kitchen = Room::new("Kitchen", &[CompassDirection::North]);
    kitchen.order_index = 2;

    let mut balcony = Zone::new(
        "Balcony",
        CompassDirection::South,
        SunPeriod::FullSun,
        WindExposure::Exposed,
    );
    balcony.order_index = 0;

    let mut monstera = Plant::new("Monstera", LightType::Indirect)
        .with_care_step(CareStep::new(
            CareStepType::Watering,
            "Water when the top 5 cm of soil are dry.",
            7,
        ))
        .with_care_step(CareStep::new(
            CareStepType::Dusting,
            "Wipe the leaves with a damp cloth.",
            14,
        ))
        .with_care_step(CareStep::new(
            CareStepType::Rotation,
            "Turn the pot a quarter turn for even growth.",
            30,
        ));
    monstera.latin_name = Some("Monstera deliciosa".to_string());
    monstera.humidity = Some(HumidityLevel::High);
    monstera.preferred_direction = CompassDirection::East;
    monstera.assign_to_room(living_room.id, Some(living_room.windows[0].id));

    let mut snake_plant = Plant::new("Snake Plant", LightType::Low).with_care_step(CareStep::new(
        CareStepType::Watering,
        "Let the soil dry out completely between waterings.",
        14,
    ));
    snake_plant.latin_name = Some("Dracaena trifasciata".to_string());
    snake_plant.humidity = Some(HumidityLevel::Low);
    snake_plant.assign_to_room(bedroom.id, None);

    let mut calathea = Plant::new("Calathea", LightType::Low)
        .with_care_step(CareStep::new(
            CareStepType::Watering,
            "Keep the soil lightly moist, use filtered water.",
            5,
        ))
        .with_care_step(CareStep::new(
            CareStepType::Misting,
            "Mist the leaves in the morning.",
            2,
        ));
    calathea.latin_name = Some("Goeppertia orbifolia".to_string());
    calathea.humidity = Some(HumidityLevel::High);
    calathea.preferred_direction = CompassDirection::North;
    calathea.assign_to_room(kitchen.id, Some(kitchen.windows[0].id));

    let mut basil = Plant::new("Basil", LightType::Direct).with_care_step(CareStep::new(
        CareStepType::Watering,
        "Water at the base every other day in summer.",
        2,
    ));
    basil.latin_name = Some("Ocimum basilicum".to_string());
    basil.notes = "Pinch off flower buds to keep the leaves coming.".to_string();
    basil.assign_to_zone(balcony.id);

    StoreContents {
        rooms: vec![living_room, bedroom, kitchen],
        zones: vec![balcony],
        plants: vec![monstera, snake_plant, calathea, basil],
        settings: AppSettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::validators::validate_plant;

    #[test]
    fn test_default_dataset_is_consistent() {
        let data = default_dataset();
        assert_eq!(data.rooms.len(), 3);
        assert_eq!(data.zones.len(), 1);
        assert_eq!(data.plants.len(), 4);
        for plant in &data.plants {
            assert!(!plant.care_steps.is_empty());
            validate_plant(plant, &data.rooms, &data.zones).unwrap();
        }
    }

    #[test]
    fn test_default_dataset_has_fresh_ids() {
        let first = default_dataset();
        let second = default_dataset();
        assert_ne!(first.rooms[0].id, second.rooms[0].id);
    }
}
