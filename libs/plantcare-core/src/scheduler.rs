//! Care due-date engine
//!
//! Pure functions deciding whether a care step is overdue or due today.
//! All day arithmetic works on calendar dates in the time zone of `now`:
//! a step completed at 23:59 yesterday with a one-day frequency is due today,
//! and a step completed earlier today is never overdue, no matter how many
//! hours have elapsed.
//!
//! Frequencies of zero or below are invalid. They never panic here; a step
//! carrying one is treated as overdue as soon as it has been completed once.

use crate::models::{CareStep, Plant};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Calendar days between the step's last completion and `now`
///
/// Returns `None` if the step was never completed. A completion stamped in
/// the future (clock skew) counts as today.
#[must_use]
pub fn days_since_completed<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> Option<i64> {
    let last = step.last_completed?;
    let completed_on = last.with_timezone(&now.timezone()).date_naive();
    Some((now.date_naive() - completed_on).num_days().max(0))
}

/// Whether the step needs doing: never done, or at least `frequency_days` calendar days ago
#[must_use]
pub fn is_overdue<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> bool {
    match days_since_completed(step, now) {
        None => true,
        Some(_) if step.frequency_days <= 0 => true,
        Some(days) => days >= i64::from(step.frequency_days),
    }
}

/// Days left until the step is due, never negative; 0 if never completed
#[must_use]
pub fn days_until_due<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> i64 {
    match days_since_completed(step, now) {
        None => 0,
        Some(_) if step.frequency_days <= 0 => 0,
        Some(days) => (i64::from(step.frequency_days) - days).max(0),
    }
}

/// Days past the due date, never negative; 0 if never completed
#[must_use]
pub fn days_overdue<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> i64 {
    match days_since_completed(step, now) {
        None => 0,
        Some(days) => (days - i64::from(step.frequency_days.max(0))).max(0),
    }
}

/// Whether the step falls due exactly today
///
/// A never-completed step is overdue rather than due today.
#[must_use]
pub fn is_due_today<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> bool {
    step.last_completed.is_some()
        && days_until_due(step, now) == 0
        && days_overdue(step, now) == 0
}

/// Calendar date on which the step is next due; today if never completed
#[must_use]
pub fn next_due_date<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> NaiveDate {
    let today = now.date_naive();
    let Some(last) = step.last_completed else {
        return today;
    };
    let completed_on = last.with_timezone(&now.timezone()).date_naive();
    completed_on
        .checked_add_signed(Duration::days(i64::from(step.frequency_days.max(0))))
        .unwrap_or(today)
}

/// Presentation status of a care step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CareStatus {
    /// Past due by `days` (0 for steps that were never done)
    Overdue { days: i64 },
    DueToday,
    Upcoming { days: i64 },
}

/// Classify a step into exactly one status bucket
#[must_use]
pub fn care_status<Tz: TimeZone>(step: &CareStep, now: &DateTime<Tz>) -> CareStatus {
    if is_due_today(step, now) {
        CareStatus::DueToday
    } else if is_overdue(step, now) {
        CareStatus::Overdue {
            days: days_overdue(step, now),
        }
    } else {
        CareStatus::Upcoming {
            days: days_until_due(step, now),
        }
    }
}

impl CareStep {
    #[must_use]
    pub fn is_overdue<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        is_overdue(self, now)
    }

    #[must_use]
    pub fn days_until_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> i64 {
        days_until_due(self, now)
    }

    #[must_use]
    pub fn is_due_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        is_due_today(self, now)
    }

    #[must_use]
    pub fn next_due_date<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> NaiveDate {
        next_due_date(self, now)
    }

    #[must_use]
    pub fn care_status<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> CareStatus {
        care_status(self, now)
    }
}

/// Collect (plant, step) pairs matching `predicate`, in plant order then step order
pub fn collect_care_steps<'a, F>(
    plants: &'a [Plant],
    mut predicate: F,
) -> Vec<(&'a Plant, &'a CareStep)>
where
    F: FnMut(&CareStep) -> bool,
{
    plants
        .iter()
        .flat_map(|plant| plant.care_steps.iter().map(move |step| (plant, step)))
        .filter(|&(_, step)| predicate(step))
        .collect()
}

/// All overdue (plant, step) pairs
#[must_use]
pub fn overdue_care_steps<'a, Tz: TimeZone>(
    plants: &'a [Plant],
    now: &DateTime<Tz>,
) -> Vec<(&'a Plant, &'a CareStep)> {
    collect_care_steps(plants, |step| is_overdue(step, now))
}

/// All (plant, step) pairs due today
#[must_use]
pub fn due_today_care_steps<'a, Tz: TimeZone>(
    plants: &'a [Plant],
    now: &DateTime<Tz>,
) -> Vec<(&'a Plant, &'a CareStep)> {
    collect_care_steps(plants, |step| is_due_today(step, now))
}

/// Plants with at least one overdue or due-today step, in plant order
#[must_use]
pub fn plants_needing_care<'a, Tz: TimeZone>(
    plants: &'a [Plant],
    now: &DateTime<Tz>,
) -> Vec<&'a Plant> {
    plants
        .iter()
        .filter(|plant| {
            plant
                .care_steps
                .iter()
                .any(|step| is_overdue(step, now) || is_due_today(step, now))
        })
        .collect()
}

/// Counts that drive the daily reminder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareSummary {
    /// Steps past due (including never completed), excluding those due today
    pub overdue: usize,
    /// Steps falling due today
    pub due_today: usize,
    /// Plants needing any care
    pub plants: Vec<Uuid>,
}

impl CareSummary {
    #[must_use]
    pub fn from_plants<Tz: TimeZone>(plants: &[Plant], now: &DateTime<Tz>) -> Self {
        let mut summary = Self::default();
        for plant in plants {
            let mut needs_care = false;
            for step in &plant.care_steps {
                match care_status(step, now) {
                    CareStatus::Overdue { .. } => summary.overdue += 1,
                    CareStatus::DueToday => summary.due_today += 1,
                    CareStatus::Upcoming { .. } => continue,
                }
                needs_care = true;
            }
            if needs_care {
                summary.plants.push(plant.id);
            }
        }
        summary
    }

    /// Total number of steps needing attention
    #[must_use]
    pub fn total(&self) -> usize {
        self.overdue + self.due_today
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareStepType, LightType};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn step(frequency_days: i32, last_completed: Option<DateTime<Utc>>) -> CareStep {
        let mut step = CareStep::new(CareStepType::Watering, "Water", frequency_days);
        step.last_completed = last_completed;
        step
    }

    #[test]
    fn test_never_completed_is_overdue_and_due_now() {
        let now = at(2024, 6, 1, 12, 0);
        let s = step(7, None);
        assert!(is_overdue(&s, &now));
        assert_eq!(days_until_due(&s, &now), 0);
        assert_eq!(days_overdue(&s, &now), 0);
        assert!(!is_due_today(&s, &now));
        assert_eq!(next_due_date(&s, &now), now.date_naive());
        assert_eq!(care_status(&s, &now), CareStatus::Overdue { days: 0 });
    }

    #[test]
    fn test_completed_today_is_not_overdue() {
        let now = at(2024, 6, 1, 18, 0);
        let s = step(3, Some(at(2024, 6, 1, 7, 30)));
        assert!(!is_overdue(&s, &now));
        assert_eq!(days_until_due(&s, &now), 3);
        assert_eq!(care_status(&s, &now), CareStatus::Upcoming { days: 3 });
    }

    #[test]
    fn test_daily_step_completed_earlier_today_is_not_overdue() {
        let now = at(2024, 6, 1, 23, 59);
        let s = step(1, Some(at(2024, 6, 1, 0, 1)));
        assert!(!is_overdue(&s, &now));
        assert_eq!(days_until_due(&s, &now), 1);
    }

    #[test]
    fn test_calendar_boundary_not_rolling_window() {
        // Two minutes elapsed, but a calendar day has passed
        let now = at(2024, 6, 2, 0, 1);
        let s = step(1, Some(at(2024, 6, 1, 23, 59)));
        assert_eq!(days_since_completed(&s, &now), Some(1));
        assert!(is_overdue(&s, &now));
        assert!(is_due_today(&s, &now));
        assert_eq!(care_status(&s, &now), CareStatus::DueToday);
    }

    #[test]
    fn test_overdue_by_several_days() {
        let now = at(2024, 6, 10, 9, 0);
        let s = step(3, Some(at(2024, 6, 1, 9, 0)));
        assert!(is_overdue(&s, &now));
        assert!(!is_due_today(&s, &now));
        assert_eq!(days_overdue(&s, &now), 6);
        assert_eq!(care_status(&s, &now), CareStatus::Overdue { days: 6 });
        assert_eq!(
            next_due_date(&s, &now),
            NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
        );
    }

    #[test]
    fn test_invalid_frequency_does_not_panic() {
        let now = at(2024, 6, 1, 12, 0);
        for frequency in [0, -1, i32::MIN] {
            let s = step(frequency, Some(now));
            assert!(is_overdue(&s, &now));
            assert_eq!(days_until_due(&s, &now), 0);
            let _ = care_status(&s, &now);
            let _ = next_due_date(&s, &now);
        }
    }

    #[test]
    fn test_future_completion_counts_as_today() {
        let now = at(2024, 6, 1, 12, 0);
        let s = step(2, Some(at(2024, 6, 3, 12, 0)));
        assert_eq!(days_since_completed(&s, &now), Some(0));
        assert!(!is_overdue(&s, &now));
    }

    #[test]
    fn test_day_boundary_follows_time_zone_of_now() {
        use chrono::FixedOffset;
        // 23:30 UTC on June 1st is already June 2nd at UTC+2
        let completed = at(2024, 6, 1, 21, 0); // 23:00 local
        let now_utc = at(2024, 6, 1, 23, 30);
        let now_local = now_utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        let s = step(1, Some(completed));
        assert!(!is_overdue(&s, &now_utc));
        assert!(is_overdue(&s, &now_local));
    }

    #[test]
    fn test_aggregation_order_and_empty_plants() {
        let now = at(2024, 6, 10, 9, 0);
        let first = Plant::new("First", LightType::Low)
            .with_care_step(step(1, None))
            .with_care_step(step(30, Some(now)));
        let empty = Plant::new("Empty", LightType::Low);
        let second = Plant::new("Second", LightType::Direct)
            .with_care_step(step(2, Some(at(2024, 6, 8, 9, 0))));
        let plants = vec![first, empty, second];

        let overdue = overdue_care_steps(&plants, &now);
        let names: Vec<&str> = overdue.iter().map(|(p, _)| p.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);

        let due = due_today_care_steps(&plants, &now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0.name, "Second");

        let needing: Vec<&str> = plants_needing_care(&plants, &now)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(needing, vec!["First", "Second"]);

        let summary = CareSummary::from_plants(&plants, &now);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.due_today, 1);
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.plants.len(), 2);
    }

    #[test]
    fn test_care_step_inherent_methods_delegate() {
        let now = at(2024, 6, 1, 12, 0);
        let s = step(5, Some(at(2024, 5, 30, 8, 0)));
        assert_eq!(s.is_overdue(&now), is_overdue(&s, &now));
        assert_eq!(s.days_until_due(&now), 3);
        assert!(!s.is_due_today(&now));
        assert_eq!(s.care_status(&now), CareStatus::Upcoming { days: 3 });
        assert_eq!(
            s.next_due_date(&now),
            NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
        );
    }

    #[test]
    fn test_system_clock_is_close_to_now() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
