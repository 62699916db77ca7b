//! Feedback reminder model.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which sessions qualify for feedback reminders and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    /// Days after the session end before a reminder becomes due.
    pub offset_days: i64,
    /// Whether Completed sessions remain eligible (Active always is).
    pub include_completed: bool,
}

impl ReminderPolicy {
    /// Largest accepted `offset_days`: ten years.
    pub const MAX_OFFSET_DAYS: i64 = 3650;

    /// The offset as a duration, or `None` when `offset_days` is negative
    /// or above [`Self::MAX_OFFSET_DAYS`].
    pub fn offset(&self) -> Option<TimeDelta> {
        if !(0..=Self::MAX_OFFSET_DAYS).contains(&self.offset_days) {
            return None;
        }
        TimeDelta::try_days(self.offset_days)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.offset() {
            Some(_) => Ok(()),
            None => Err(format!(
                "reminder offset_days must be between 0 and {}, got {}",
                Self::MAX_OFFSET_DAYS,
                self.offset_days
            )),
        }
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            offset_days: 1,
            include_completed: true,
        }
    }
}

/// A reminder that is due now. Delivery is someone else's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReminder {
    pub enrollment_id: Uuid,
    pub session_id: Uuid,
    pub employee_id: Uuid,
    pub due_since: DateTime<Utc>,
}
