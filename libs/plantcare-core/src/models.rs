//! Data models for rooms, zones, plants and their care steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Eight-point compass direction used for windows, zone aspects and light preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

/// Serialized code of every direction. This table is the only place the
/// persisted spelling is defined.
const DIRECTION_CODES: [(CompassDirection, &str); 8] = [
    (CompassDirection::North, "N"),
    (CompassDirection::NorthEast, "NE"),
    (CompassDirection::East, "E"),
    (CompassDirection::SouthEast, "SE"),
    (CompassDirection::South, "S"),
    (CompassDirection::SouthWest, "SW"),
    (CompassDirection::West, "W"),
    (CompassDirection::NorthWest, "NW"),
];

impl CompassDirection {
    /// All directions, clockwise from north
    pub const ALL: [CompassDirection; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Short code ("N", "NE", ...)
    #[must_use]
    pub fn code(self) -> &'static str {
        DIRECTION_CODES
            .iter()
            .find(|(direction, _)| *direction == self)
            .map_or("N", |(_, code)| code)
    }

    /// Parse a short code, case-insensitively
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        DIRECTION_CODES
            .iter()
            .find(|(_, c)| c.eq_ignore_ascii_case(code))
            .map(|(direction, _)| *direction)
    }

    /// Human readable name
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::NorthEast => "North-East",
            Self::East => "East",
            Self::SouthEast => "South-East",
            Self::South => "South",
            Self::SouthWest => "South-West",
            Self::West => "West",
            Self::NorthWest => "North-West",
        }
    }

    /// Bearing in degrees, clockwise from north
    #[must_use]
    pub fn degrees(self) -> u16 {
        match self {
            Self::North => 0,
            Self::NorthEast => 45,
            Self::East => 90,
            Self::SouthEast => 135,
            Self::South => 180,
            Self::SouthWest => 225,
            Self::West => 270,
            Self::NorthWest => 315,
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CompassDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown compass direction: {s}"))
    }
}

impl TryFrom<String> for CompassDirection {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompassDirection> for String {
    fn from(direction: CompassDirection) -> Self {
        direction.code().to_string()
    }
}

/// Kind of light a plant needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "indirect")]
    Indirect,
    #[serde(rename = "low")]
    Low,
}

/// Preferred air humidity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HumidityLevel {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

/// How long an outdoor zone is in the sun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SunPeriod {
    #[serde(rename = "full_sun")]
    FullSun,
    #[serde(rename = "partial_sun")]
    PartialSun,
    #[serde(rename = "partial_shade")]
    PartialShade,
    #[serde(rename = "full_shade")]
    FullShade,
}

impl SunPeriod {
    /// Typical hours of direct sun for this period class
    #[must_use]
    pub fn base_sun_hours(self) -> f64 {
        match self {
            Self::FullSun => 8.0,
            Self::PartialSun => 5.0,
            Self::PartialShade => 3.0,
            Self::FullShade => 1.0,
        }
    }
}

/// How exposed an outdoor zone is to wind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindExposure {
    #[serde(rename = "sheltered")]
    Sheltered,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "exposed")]
    Exposed,
}

/// Type of a recurring care step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CareStepType {
    Watering,
    Misting,
    Dusting,
    Rotation,
    /// User defined step, named by the user
    Custom { name: String },
}

impl CareStepType {
    /// Name shown to the user
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Watering => "Watering".to_string(),
            Self::Misting => "Misting".to_string(),
            Self::Dusting => "Dusting".to_string(),
            Self::Rotation => "Rotation".to_string(),
            Self::Custom { name } if name.trim().is_empty() => "Custom".to_string(),
            Self::Custom { name } => name.trim().to_string(),
        }
    }
}

/// One recurring maintenance task for a plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareStep {
    /// Unique identifier
    pub id: Uuid,
    /// What kind of care this is
    pub step_type: CareStepType,
    /// Free text instructions
    pub instructions: String,
    /// Repeat interval in days; the store only accepts positive values
    pub frequency_days: i32,
    /// When the step was last done
    pub last_completed: Option<DateTime<Utc>>,
}

impl CareStep {
    /// Create a care step that has never been completed
    #[must_use]
    pub fn new(
        step_type: CareStepType,
        instructions: impl Into<String>,
        frequency_days: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_type,
            instructions: instructions.into(),
            frequency_days,
            last_completed: None,
        }
    }

    /// The watering step given to plants migrated from older data
    #[must_use]
    pub fn default_watering() -> Self {
        Self::new(
            CareStepType::Watering,
            plantcare_common::DEFAULT_WATERING_INSTRUCTIONS,
            plantcare_common::DEFAULT_WATERING_FREQUENCY_DAYS,
        )
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        self.step_type.display_name()
    }
}

/// A window of a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub id: Uuid,
    pub direction: CompassDirection,
}

impl Window {
    #[must_use]
    pub fn new(direction: CompassDirection) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
        }
    }
}

/// An indoor room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: Uuid,
    /// Room name
    pub name: String,
    /// Windows, in the order the user added them
    pub windows: Vec<Window>,
    /// Display position; sorted ascending
    pub order_index: i32,
}

impl Room {
    /// Create a room with one window per direction given
    #[must_use]
    pub fn new(name: impl Into<String>, window_directions: &[CompassDirection]) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            windows: window_directions.iter().copied().map(Window::new).collect(),
            order_index: 0,
        }
    }

    /// Look up one of this room's windows
    #[must_use]
    pub fn window(&self, window_id: Uuid) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    #[must_use]
    pub fn has_window(&self, window_id: Uuid) -> bool {
        self.window(window_id).is_some()
    }
}

/// An outdoor space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique identifier
    pub id: Uuid,
    /// Zone name
    pub name: String,
    /// Direction the zone faces
    pub aspect: CompassDirection,
    /// Sun exposure class
    pub sun_period: SunPeriod,
    /// Wind exposure class
    pub wind_exposure: WindExposure,
    /// Explicit hours of sun; inferred from aspect and sun period when absent
    pub sun_hours: Option<f64>,
    /// Display position; sorted ascending
    pub order_index: i32,
}

impl Zone {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        aspect: CompassDirection,
        sun_period: SunPeriod,
        wind_exposure: WindExposure,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            aspect,
            sun_period,
            wind_exposure,
            sun_hours: None,
            order_index: 0,
        }
    }

    /// Hours of sun the zone gets, using the explicit override when set
    #[must_use]
    pub fn effective_sun_hours(&self) -> f64 {
        if let Some(hours) = self.sun_hours {
            return hours.max(0.0);
        }
        let adjustment = match self.aspect {
            CompassDirection::South => 1.0,
            CompassDirection::SouthEast | CompassDirection::SouthWest => 0.5,
            CompassDirection::East | CompassDirection::West => 0.0,
            CompassDirection::NorthEast | CompassDirection::NorthWest => -0.5,
            CompassDirection::North => -1.0,
        };
        (self.sun_period.base_sun_hours() + adjustment).max(0.0)
    }
}

/// Where a plant lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantLocation {
    Room {
        room_id: Uuid,
        window_id: Option<Uuid>,
    },
    Zone {
        zone_id: Uuid,
    },
    Unassigned,
}

/// A plant and its care steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    /// Unique identifier
    pub id: Uuid,
    /// Common name
    pub name: String,
    /// Botanical name
    pub latin_name: Option<String>,
    /// Room the plant stands in
    pub assigned_room_id: Option<Uuid>,
    /// Window of `assigned_room_id` the plant stands at
    pub assigned_window_id: Option<Uuid>,
    /// Outdoor zone the plant grows in
    pub assigned_zone_id: Option<Uuid>,
    /// Light requirement
    pub light_type: LightType,
    /// Direction of light the plant does best in
    pub preferred_direction: CompassDirection,
    /// Humidity preference
    pub humidity: Option<HumidityLevel>,
    /// General notes
    pub notes: String,
    /// Recurring care, in the order the user arranged it
    pub care_steps: Vec<CareStep>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Plant {
    /// Create an unassigned plant without care steps
    #[must_use]
    pub fn new(name: impl Into<String>, light_type: LightType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            latin_name: None,
            assigned_room_id: None,
            assigned_window_id: None,
            assigned_zone_id: None,
            light_type,
            preferred_direction: CompassDirection::South,
            humidity: None,
            notes: String::new(),
            care_steps: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_care_step(mut self, step: CareStep) -> Self {
        self.care_steps.push(step);
        self
    }

    #[must_use]
    pub fn care_step(&self, step_id: Uuid) -> Option<&CareStep> {
        self.care_steps.iter().find(|s| s.id == step_id)
    }

    pub fn care_step_mut(&mut self, step_id: Uuid) -> Option<&mut CareStep> {
        self.care_steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Current location, derived from the assignment fields
    #[must_use]
    pub fn location(&self) -> PlantLocation {
        match (self.assigned_room_id, self.assigned_zone_id) {
            (Some(room_id), _) => PlantLocation::Room {
                room_id,
                window_id: self.assigned_window_id,
            },
            (None, Some(zone_id)) => PlantLocation::Zone { zone_id },
            (None, None) => PlantLocation::Unassigned,
        }
    }

    /// Place the plant in a room, dropping any zone assignment
    pub fn assign_to_room(&mut self, room_id: Uuid, window_id: Option<Uuid>) {
        self.assigned_room_id = Some(room_id);
        self.assigned_window_id = window_id;
        self.assigned_zone_id = None;
    }

    /// Place the plant in a zone, dropping any room assignment
    pub fn assign_to_zone(&mut self, zone_id: Uuid) {
        self.assigned_zone_id = Some(zone_id);
        self.assigned_room_id = None;
        self.assigned_window_id = None;
    }

    pub fn clear_room_assignment(&mut self) {
        self.assigned_room_id = None;
        self.assigned_window_id = None;
    }
}

fn default_reminder_hour() -> u8 {
    plantcare_common::DEFAULT_REMINDER_HOUR
}

fn default_true() -> bool {
    true
}

/// User preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Room order used during care walkthroughs; rooms not listed follow in display order
    #[serde(default)]
    pub care_room_order: Vec<Uuid>,
    /// Hour of day (0-23) for the daily care reminder
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u8,
    /// Whether a backup is taken automatically at startup once a day
    #[serde(default = "default_true")]
    pub auto_backup_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            care_room_order: Vec::new(),
            reminder_hour: default_reminder_hour(),
            auto_backup_enabled: true,
        }
    }
}

/// Metadata of a locally stored plant photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// File name inside the photo directory
    pub file_name: String,
    /// Plant the photo belongs to, when the file stem is a plant id
    pub plant_id: Option<Uuid>,
    /// File size
    pub size_bytes: u64,
    /// Last modification time reported by the file system
    pub modified_at: Option<DateTime<Utc>>,
}
