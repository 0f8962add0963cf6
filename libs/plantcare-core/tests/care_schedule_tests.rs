//! Due-date behavior of care steps across frequencies, offsets and day boundaries

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use plantcare_core::scheduler::{
    care_status, days_overdue, days_until_due, is_due_today, is_overdue, next_due_date,
};
use plantcare_core::{CareStatus, CareStep, CareStepType};
use proptest::prelude::*;

fn step(frequency_days: i32, last_completed: Option<DateTime<Utc>>) -> CareStep {
    let mut step = CareStep::new(CareStepType::Watering, "Water", frequency_days);
    step.last_completed = last_completed;
    step
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

#[test]
fn test_never_completed_is_overdue_not_due_today() {
    let step = step(3, None);
    let now = noon();

    assert!(is_overdue(&step, &now));
    assert!(!is_due_today(&step, &now));
    assert_eq!(days_until_due(&step, &now), 0);
    assert_eq!(care_status(&step, &now), CareStatus::Overdue { days: 0 });
    assert_eq!(next_due_date(&step, &now), now.date_naive());
}

#[test]
fn test_completed_today_waits_full_frequency() {
    let now = noon();
    let step = step(5, Some(now - Duration::hours(3)));

    assert!(!is_overdue(&step, &now));
    assert_eq!(days_until_due(&step, &now), 5);
    assert_eq!(care_status(&step, &now), CareStatus::Upcoming { days: 5 });
}

#[test]
fn test_completed_frequency_plus_one_days_ago_is_overdue() {
    let now = noon();
    let step = step(4, Some(now - Duration::days(5)));

    assert!(is_overdue(&step, &now));
    assert!(!is_due_today(&step, &now));
    assert_eq!(days_overdue(&step, &now), 1);
}

#[test]
fn test_late_evening_completion_is_due_next_morning() {
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let completed = tz.with_ymd_and_hms(2024, 6, 14, 23, 59, 0).unwrap();
    let now = tz.with_ymd_and_hms(2024, 6, 15, 0, 1, 0).unwrap();
    let step = step(1, Some(completed.with_timezone(&Utc)));

    assert!(is_due_today(&step, &now));
    assert_eq!(care_status(&step, &now), CareStatus::DueToday);
}

#[test]
fn test_day_math_uses_the_zone_of_now() {
    // 22:30 UTC on the 14th is already the 15th in UTC+2
    let completed = Utc.with_ymd_and_hms(2024, 6, 14, 22, 30, 0).unwrap();
    let tz = FixedOffset::east_opt(2 * 3600).unwrap();
    let now = tz.with_ymd_and_hms(2024, 6, 15, 20, 0, 0).unwrap();
    let step = step(1, Some(completed));

    assert!(!is_overdue(&step, &now));
    assert_eq!(days_until_due(&step, &now), 1);
}

#[test]
fn test_future_completion_counts_as_today() {
    let now = noon();
    let step = step(2, Some(now + Duration::days(3)));

    assert!(!is_overdue(&step, &now));
    assert_eq!(days_until_due(&step, &now), 2);
}

proptest! {
    #[test]
    fn prop_status_matches_offset(frequency in 1i32..400, offset in 0i64..1200) {
        let now = noon();
        let step = step(frequency, Some(now - Duration::days(offset)));
        let frequency = i64::from(frequency);

        prop_assert_eq!(days_until_due(&step, &now), (frequency - offset).max(0));
        prop_assert_eq!(is_overdue(&step, &now), offset >= frequency);
        prop_assert_eq!(is_due_today(&step, &now), offset == frequency);
        prop_assert_eq!(days_overdue(&step, &now), (offset - frequency).max(0));

        let expected = if offset == frequency {
            CareStatus::DueToday
        } else if offset > frequency {
            CareStatus::Overdue { days: offset - frequency }
        } else {
            CareStatus::Upcoming { days: frequency - offset }
        };
        prop_assert_eq!(care_status(&step, &now), expected);
    }

    #[test]
    fn prop_next_due_date_is_completion_plus_frequency(frequency in 1i32..400, offset in 0i64..1200) {
        let now = noon();
        let completed = now - Duration::days(offset);
        let step = step(frequency, Some(completed));

        prop_assert_eq!(
            next_due_date(&step, &now),
            completed.date_naive() + Duration::days(i64::from(frequency))
        );
    }

    #[test]
    fn prop_invalid_frequencies_never_panic(frequency in -10_000i32..=0, offset in -50i64..5000) {
        let now = noon();
        let step = step(frequency, Some(now - Duration::days(offset)));

        prop_assert!(days_until_due(&step, &now) >= 0);
        prop_assert!(days_overdue(&step, &now) >= 0);
        let _ = care_status(&step, &now);
        let _ = next_due_date(&step, &now);
    }
}
