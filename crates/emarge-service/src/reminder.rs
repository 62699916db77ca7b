//! Feedback reminder scheduler.
//!
//! Stateless: each call reads current state and recomputes what is due.
//! Calling it twice at the same `now` yields the same list.

use chrono::{DateTime, Utc};
use emarge_core::error::AttendanceResult;
use emarge_core::models::reminder::{FeedbackReminder, ReminderPolicy};
use emarge_core::reminder::{due_reminders, eligible_statuses};
use emarge_core::repository::{AttendanceStore, EnrollmentRepository, FeedbackStore, SessionRepository};
use tracing::info;
use uuid::Uuid;

pub struct ReminderScheduler<R: AttendanceStore, F: FeedbackStore> {
    store: R,
    feedback: F,
    policy: ReminderPolicy,
}

impl<R: AttendanceStore, F: FeedbackStore> ReminderScheduler<R, F> {
    pub fn new(store: R, feedback: F, policy: ReminderPolicy) -> Self {
        Self {
            store,
            feedback,
            policy,
        }
    }

    pub async fn due_feedback_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> AttendanceResult<Vec<FeedbackReminder>> {
        let statuses = eligible_statuses(&self.policy);
        let sessions = self.store.sessions().list_by_status(&statuses).await?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        let enrollments = self.store.enrollments().list_by_sessions(&session_ids).await?;
        let enrollment_ids: Vec<Uuid> = enrollments.iter().map(|e| e.id).collect();
        let with_feedback = self.feedback.with_feedback(&enrollment_ids).await?;

        let due = due_reminders(&sessions, &enrollments, &with_feedback, &self.policy, now);
        info!(count = due.len(), %now, "Feedback reminders computed");
        Ok(due)
    }
}
