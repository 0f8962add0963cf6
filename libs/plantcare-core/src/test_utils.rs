//! Test utilities and mock data for plant care tests

use crate::error::{PlantCareError, Result};
use crate::models::{
    AppSettings, CareStep, CareStepType, CompassDirection, LightType, Plant, Room, SunPeriod,
    WindExposure, Zone,
};
use crate::notifications::NotificationScheduler;
use crate::scheduler::Clock;
use crate::storage::{KeyValueStore, MemoryKeyValueStore};
use crate::store::{PlantStore, StoreContents};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock set to a local wall-clock time
    ///
    /// # Panics
    /// Panics if the date is invalid or the time does not exist locally
    #[must_use]
    pub fn at_local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let local = Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(year, month, day)
                    .unwrap()
                    .and_hms_opt(hour, minute, 0)
                    .unwrap(),
            )
            .earliest()
            .unwrap();
        Self::new(local.with_timezone(&Utc))
    }

    /// Clock set to noon today, local time, so whole-day offsets never cross midnight
    ///
    /// # Panics
    /// Panics if noon does not exist locally
    #[must_use]
    pub fn local_noon() -> Self {
        let today = Local::now().date_naive();
        let noon = Local
            .from_local_datetime(&today.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap();
        Self::new(noon.with_timezone(&Utc))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A call received by [`RecordingScheduler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderCall {
    Scheduled {
        summary: String,
        count: usize,
        hour: u8,
    },
    Cancelled,
}

/// Reminder scheduler that records every call
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<ReminderCall>>,
}

impl RecordingScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ReminderCall> {
        self.calls.lock().clone()
    }
}

impl NotificationScheduler for RecordingScheduler {
    fn schedule_daily_reminder(&self, summary: &str, count: usize, hour: u8) -> Result<()> {
        self.calls.lock().push(ReminderCall::Scheduled {
            summary: summary.to_string(),
            count,
            hour,
        });
        Ok(())
    }

    fn cancel_reminders(&self) -> Result<()> {
        self.calls.lock().push(ReminderCall::Cancelled);
        Ok(())
    }
}

/// Storage that can read but refuses every write
#[derive(Debug, Default)]
pub struct ReadOnlyKeyValueStore {
    inner: MemoryKeyValueStore,
}

impl ReadOnlyKeyValueStore {
    /// Wrap pre-filled values
    ///
    /// # Panics
    /// Panics if a value cannot be stored in memory
    #[must_use]
    pub fn with_values(values: &[(&str, &[u8])]) -> Self {
        let inner = MemoryKeyValueStore::new();
        for (key, bytes) in values {
            inner.write_bytes(key, bytes).unwrap();
        }
        Self { inner }
    }
}

impl KeyValueStore for ReadOnlyKeyValueStore {
    fn read_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read_bytes(key)
    }

    fn write_bytes(&self, key: &str, _bytes: &[u8]) -> Result<()> {
        Err(PlantCareError::save_failed(format!("{key} is read-only")))
    }

    fn remove(&self, key: &str) -> Result<()> {
        Err(PlantCareError::save_failed(format!("{key} is read-only")))
    }
}

/// Empty store over in-memory storage with a clock fixed at local noon
#[must_use]
pub fn create_test_store() -> (PlantStore, Arc<MemoryKeyValueStore>, Arc<FixedClock>) {
    let storage = Arc::new(MemoryKeyValueStore::new());
    let clock = Arc::new(FixedClock::local_noon());
    let store = PlantStore::empty(storage.clone(), clock.clone());
    (store, storage, clock)
}

/// Unassigned plant with one watering step
#[must_use]
pub fn plant_with_step(
    name: &str,
    frequency_days: i32,
    last_completed: Option<DateTime<Utc>>,
) -> Plant {
    let mut step = CareStep::new(CareStepType::Watering, "Water thoroughly", frequency_days);
    step.last_completed = last_completed;
    Plant::new(name, LightType::Indirect).with_care_step(step)
}

/// Mock collections with fixed ids
///
/// # Panics
/// Panics if UUID parsing fails (should not happen with hardcoded UUIDs)
#[must_use]
pub fn create_mock_contents() -> StoreContents {
    let mut kitchen = Room::new("Kitchen", &[CompassDirection::East]);
    kitchen.id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000001").unwrap();
    kitchen.windows[0].id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000002").unwrap();
    kitchen.order_index = 0;

    let mut study = Room::new("Study", &[]);
    study.id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000003").unwrap();
    study.order_index = 1;

    let mut terrace = Zone::new(
        "Terrace",
        CompassDirection::SouthWest,
        SunPeriod::PartialSun,
        WindExposure::Sheltered,
    );
    terrace.id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000010").unwrap();

    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    let mut herb = plant_with_step(
        "Thyme",
        4,
        Some(Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap()),
    );
    herb.id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000100").unwrap();
    herb.care_steps[0].id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000101").unwrap();
    herb.created_at = created;
    herb.assign_to_room(kitchen.id, Some(kitchen.windows[0].id));

    let mut olive = plant_with_step("Olive Tree", 10, None);
    olive.id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000200").unwrap();
    olive.care_steps[0].id = Uuid::parse_str("6f1c2a44-0000-4000-8000-000000000201").unwrap();
    olive.light_type = LightType::Direct;
    olive.created_at = created;
    olive.assign_to_zone(terrace.id);

    StoreContents {
        rooms: vec![kitchen, study],
        zones: vec![terrace],
        plants: vec![herb, olive],
        settings: AppSettings::default(),
    }
}
