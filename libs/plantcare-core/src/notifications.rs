//! Daily care reminders
//!
//! The platform scheduler is an external collaborator. Calls into it are
//! fire-and-forget: failures are logged and never reach the caller.

use crate::error::Result;
use crate::scheduler::CareSummary;
use tracing::{debug, info, warn};

/// Platform facility that fires a daily calendar notification
pub trait NotificationScheduler: Send + Sync {
    /// Replace any pending reminder with a daily one at `hour` (0-23)
    ///
    /// # Errors
    /// Returns an error if the platform rejects the request
    fn schedule_daily_reminder(&self, summary: &str, count: usize, hour: u8) -> Result<()>;

    /// Remove all pending reminders
    ///
    /// # Errors
    /// Returns an error if the platform rejects the request
    fn cancel_reminders(&self) -> Result<()>;
}

/// Scheduler that only writes reminders to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationScheduler;

impl NotificationScheduler for LogNotificationScheduler {
    fn schedule_daily_reminder(&self, summary: &str, count: usize, hour: u8) -> Result<()> {
        info!(count, hour, "Daily care reminder: {}", summary);
        Ok(())
    }

    fn cancel_reminders(&self) -> Result<()> {
        info!("Daily care reminders cancelled");
        Ok(())
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Reminder text for a care summary, `None` when nothing needs care
#[must_use]
pub fn reminder_text(summary: &CareSummary) -> Option<String> {
    if summary.is_empty() {
        return None;
    }
    let plants = plural(summary.plants.len(), "plant needs", "plants need");
    let detail = match (summary.overdue, summary.due_today) {
        (0, due) => format!("{} due today", plural(due, "task", "tasks")),
        (overdue, 0) => format!("{} overdue", plural(overdue, "task", "tasks")),
        (overdue, due) => format!("{overdue} overdue, {due} due today"),
    };
    Some(format!("{plants} care: {detail}"))
}

/// Bring the platform reminder in line with `summary`
///
/// Schedules a reminder when anything needs care and cancels otherwise.
pub fn sync_reminders(scheduler: &dyn NotificationScheduler, summary: &CareSummary, hour: u8) {
    let result = match reminder_text(summary) {
        Some(text) => {
            debug!("Scheduling care reminder for {} steps", summary.total());
            scheduler.schedule_daily_reminder(&text, summary.total(), hour.min(23))
        }
        None => {
            debug!("Nothing needs care, cancelling reminders");
            scheduler.cancel_reminders()
        }
    };
    if let Err(e) = result {
        warn!("Failed to update care reminders: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlantCareError;
    use uuid::Uuid;

    struct FailingScheduler;

    impl NotificationScheduler for FailingScheduler {
        fn schedule_daily_reminder(&self, _: &str, _: usize, _: u8) -> Result<()> {
            Err(PlantCareError::configuration("notifications disabled"))
        }

        fn cancel_reminders(&self) -> Result<()> {
            Err(PlantCareError::configuration("notifications disabled"))
        }
    }

    fn summary(overdue: usize, due_today: usize, plants: usize) -> CareSummary {
        CareSummary {
            overdue,
            due_today,
            plants: (0..plants).map(|_| Uuid::new_v4()).collect(),
        }
    }

    #[test]
    fn test_reminder_text_empty() {
        assert_eq!(reminder_text(&CareSummary::default()), None);
    }

    #[test]
    fn test_reminder_text_variants() {
        assert_eq!(
            reminder_text(&summary(0, 1, 1)).unwrap(),
            "1 plant needs care: 1 task due today"
        );
        assert_eq!(
            reminder_text(&summary(3, 0, 2)).unwrap(),
            "2 plants need care: 3 tasks overdue"
        );
        assert_eq!(
            reminder_text(&summary(2, 4, 5)).unwrap(),
            "5 plants need care: 2 overdue, 4 due today"
        );
    }

    #[test]
    fn test_sync_reminders_swallows_errors() {
        sync_reminders(&FailingScheduler, &summary(1, 0, 1), 9);
        sync_reminders(&FailingScheduler, &CareSummary::default(), 9);
    }

    #[test]
    fn test_log_scheduler_never_fails() {
        let scheduler = LogNotificationScheduler;
        assert!(scheduler.schedule_daily_reminder("x", 1, 9).is_ok());
        assert!(scheduler.cancel_reminders().is_ok());
    }
}
