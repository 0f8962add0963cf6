//! Versioned plant persistence and the compatibility shim for older data
//!
//! Plants are written as `{ "schema_version": N, "plants": [...] }`. Data
//! written by older releases is either an envelope with a lower version or a
//! bare array. Such data is decoded leniently, and every plant that comes out
//! of it without care steps gets a default watering step.

use crate::error::PlantCareError;
use crate::models::{CareStep, CompassDirection, HumidityLevel, LightType, Plant};
use chrono::{DateTime, Utc};
use plantcare_common::PLANT_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// On-disk form of the plant collection
#[derive(Debug, Serialize)]
struct PlantsEnvelope<'a> {
    schema_version: u32,
    plants: &'a [Plant],
}

/// Result of decoding persisted plant bytes
#[derive(Debug)]
pub enum PlantDecode {
    /// Current envelope, loaded as is
    Current(Vec<Plant>),
    /// Older data passed through the compatibility shim
    Migrated {
        plants: Vec<Plant>,
        /// Plants that received the default watering step
        shimmed: usize,
        from_version: Option<u32>,
    },
    /// Nothing usable; callers fall back to the default dataset
    Unreadable(PlantCareError),
}

/// Plant shape of older releases: everything but the name is optional and
/// field names may be camelCase
#[derive(Debug, Deserialize)]
struct LegacyPlant {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    #[serde(default, alias = "latinName")]
    latin_name: Option<String>,
    #[serde(default, alias = "assignedRoomID", alias = "assignedRoomId")]
    assigned_room_id: Option<Uuid>,
    #[serde(default, alias = "assignedWindowID", alias = "assignedWindowId")]
    assigned_window_id: Option<Uuid>,
    #[serde(default, alias = "assignedZoneID", alias = "assignedZoneId")]
    assigned_zone_id: Option<Uuid>,
    #[serde(default, alias = "lightType")]
    light_type: Option<String>,
    #[serde(
        default,
        alias = "preferredLightDirection",
        alias = "preferredDirection"
    )]
    preferred_direction: Option<String>,
    #[serde(default, alias = "humidityPreference")]
    humidity: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default, alias = "careSteps")]
    care_steps: Vec<Value>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
}

fn parse_light_type(raw: &str) -> Option<LightType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "direct" => Some(LightType::Direct),
        "indirect" => Some(LightType::Indirect),
        "low" | "low light" => Some(LightType::Low),
        _ => None,
    }
}

fn parse_humidity(raw: &str) -> Option<HumidityLevel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Some(HumidityLevel::Low),
        "medium" => Some(HumidityLevel::Medium),
        "high" => Some(HumidityLevel::High),
        _ => None,
    }
}

impl LegacyPlant {
    fn into_plant(self) -> Plant {
        let mut plant = Plant::new(
            self.name,
            self.light_type
                .as_deref()
                .and_then(parse_light_type)
                .unwrap_or(LightType::Indirect),
        );
        if let Some(id) = self.id {
            plant.id = id;
        }
        plant.latin_name = self.latin_name.filter(|n| !n.trim().is_empty());
        plant.assigned_room_id = self.assigned_room_id;
        plant.assigned_window_id = self.assigned_window_id;
        plant.assigned_zone_id = self.assigned_zone_id;
        if let Some(direction) = self
            .preferred_direction
            .as_deref()
            .and_then(CompassDirection::from_code)
        {
            plant.preferred_direction = direction;
        }
        plant.humidity = self.humidity.as_deref().and_then(parse_humidity);
        plant.notes = self.notes.unwrap_or_default();
        if let Some(created_at) = self.created_at {
            plant.created_at = created_at;
        }
        plant.care_steps = self
            .care_steps
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<CareStep>(raw) {
                Ok(step) => Some(step),
                Err(e) => {
                    debug!("Dropping unreadable legacy care step: {}", e);
                    None
                }
            })
            .collect();
        plant
    }
}

/// Give every plant without care steps the default watering step; returns the count
pub fn apply_default_watering(plants: &mut [Plant]) -> usize {
    let mut shimmed = 0;
    for plant in plants.iter_mut().filter(|p| p.care_steps.is_empty()) {
        plant.care_steps.push(CareStep::default_watering());
        shimmed += 1;
    }
    shimmed
}

/// Decode an older plant list and apply the default watering shim
pub(crate) fn decode_legacy(plants: Value, from_version: Option<u32>) -> PlantDecode {
    match serde_json::from_value::<Vec<LegacyPlant>>(plants) {
        Ok(legacy) => {
            let mut plants: Vec<Plant> = legacy.into_iter().map(LegacyPlant::into_plant).collect();
            let shimmed = apply_default_watering(&mut plants);
            let fallback = PlantCareError::SchemaMigrationFallback {
                message: format!(
                    "migrated {} plants from schema {}, {} received a default watering step",
                    plants.len(),
                    from_version.map_or_else(|| "untagged".to_string(), |v| v.to_string()),
                    shimmed
                ),
            };
            warn!("{}", fallback);
            PlantDecode::Migrated {
                plants,
                shimmed,
                from_version,
            }
        }
        Err(e) => PlantDecode::Unreadable(PlantCareError::invalid_data(format!(
            "plant data matches no known schema: {e}"
        ))),
    }
}

/// Decode persisted plant bytes, migrating older formats
#[must_use]
pub fn decode_plants(bytes: &[u8]) -> PlantDecode {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => return PlantDecode::Unreadable(PlantCareError::Serialization(e)),
    };

    match value {
        Value::Array(_) => decode_legacy(value, None),
        Value::Object(mut map) => {
            let version = map
                .get("schema_version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok());
            let Some(plants) = map.remove("plants") else {
                return PlantDecode::Unreadable(PlantCareError::invalid_data(
                    "plant envelope has no plants",
                ));
            };
            match version {
                Some(PLANT_SCHEMA_VERSION) => {
                    match serde_json::from_value::<Vec<Plant>>(plants.clone()) {
                        Ok(plants) => PlantDecode::Current(plants),
                        Err(e) => {
                            warn!("Current plant envelope failed strict decoding: {}", e);
                            decode_legacy(plants, version)
                        }
                    }
                }
                other => decode_legacy(plants, other),
            }
        }
        _ => PlantDecode::Unreadable(PlantCareError::invalid_data(
            "plant data is neither an envelope nor a list",
        )),
    }
}

/// Encode plants in the current envelope
///
/// # Errors
/// Returns a serialization error if encoding fails
pub fn encode_plants(plants: &[Plant]) -> crate::error::Result<Vec<u8>> {
    Ok(serde_json::to_vec(&PlantsEnvelope {
        schema_version: PLANT_SCHEMA_VERSION,
        plants,
    })?)
}
