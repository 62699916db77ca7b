//! Feedback reminder eligibility.
//!
//! Pure computation: given the current sessions, enrollments and the set
//! of enrollments that already left feedback, list the reminders due at
//! `now`. Nothing is remembered between calls.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::enrollment::Enrollment;
use crate::models::reminder::{FeedbackReminder, ReminderPolicy};
use crate::models::session::{Session, SessionStatus};

/// Statuses whose sessions can produce reminders under `policy`.
pub fn eligible_statuses(policy: &ReminderPolicy) -> Vec<SessionStatus> {
    let mut statuses = vec![SessionStatus::Active];
    if policy.include_completed {
        statuses.push(SessionStatus::Completed);
    }
    statuses
}

/// Reminders due at `now`, ordered by session end, then enrollment
/// creation.
pub fn due_reminders(
    sessions: &[Session],
    enrollments: &[Enrollment],
    with_feedback: &HashSet<Uuid>,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> Vec<FeedbackReminder> {
    // Out-of-range offsets are rejected when configuration loads; here
    // they simply make nothing due.
    let Some(offset) = policy.offset() else {
        return Vec::new();
    };
    let statuses = eligible_statuses(policy);

    let due_since: HashMap<Uuid, DateTime<Utc>> = sessions
        .iter()
        .filter(|s| statuses.contains(&s.status))
        .filter_map(|s| s.ends_at.checked_add_signed(offset).map(|due| (s.id, due)))
        .filter(|(_, due)| *due <= now)
        .collect();

    let mut due: Vec<(&Enrollment, DateTime<Utc>)> = enrollments
        .iter()
        .filter(|e| !with_feedback.contains(&e.id))
        .filter_map(|e| due_since.get(&e.session_id).map(|at| (e, *at)))
        .collect();
    due.sort_by_key(|(e, at)| (*at, e.created_at, e.id));

    due.into_iter()
        .map(|(e, at)| FeedbackReminder {
            enrollment_id: e.id,
            session_id: e.session_id,
            employee_id: e.employee_id,
            due_since: at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(status: SessionStatus, ends_at: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            title: "Forklift refresher".into(),
            location: "Warehouse B".into(),
            trainer_id: Uuid::new_v4(),
            starts_at: ends_at - Duration::hours(7),
            ends_at,
            status,
            version: 0,
            token_hash: String::new(),
            created_at: ends_at,
            updated_at: ends_at,
        }
    }

    fn enroll(session: &Session) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            session_id: session.id,
            employee_id: Uuid::new_v4(),
            token_hash: String::new(),
            created_at: session.created_at,
        }
    }

    #[test]
    fn due_after_offset_without_feedback() {
        let now = Utc::now();
        let policy = ReminderPolicy::default();
        let s = session(SessionStatus::Active, now - Duration::days(2));
        let e = enroll(&s);

        let due = due_reminders(&[s.clone()], &[e.clone()], &HashSet::new(), &policy, now);
        assert_eq!(
            due,
            vec![FeedbackReminder {
                enrollment_id: e.id,
                session_id: s.id,
                employee_id: e.employee_id,
                due_since: s.ends_at + Duration::days(1),
            }]
        );
    }

    #[test]
    fn not_due_before_offset_elapses() {
        let now = Utc::now();
        let s = session(SessionStatus::Active, now - Duration::hours(3));
        let e = enroll(&s);

        let due = due_reminders(&[s], &[e], &HashSet::new(), &ReminderPolicy::default(), now);
        assert!(due.is_empty());
    }

    #[test]
    fn feedback_suppresses_reminder() {
        let now = Utc::now();
        let s = session(SessionStatus::Completed, now - Duration::days(5));
        let done = enroll(&s);
        let pending = enroll(&s);
        let feedback: HashSet<Uuid> = [done.id].into_iter().collect();

        let due = due_reminders(
            &[s],
            &[done, pending.clone()],
            &feedback,
            &ReminderPolicy::default(),
            now,
        );
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].enrollment_id, pending.id);
    }

    #[test]
    fn completed_cutoff_is_configurable() {
        let now = Utc::now();
        let s = session(SessionStatus::Completed, now - Duration::days(3));
        let e = enroll(&s);
        let policy = ReminderPolicy {
            offset_days: 1,
            include_completed: false,
        };

        assert!(due_reminders(&[s], &[e], &HashSet::new(), &policy, now).is_empty());
    }

    #[test]
    fn other_statuses_never_remind() {
        let now = Utc::now();
        for status in [
            SessionStatus::Draft,
            SessionStatus::NotStarted,
            SessionStatus::Cancelled,
        ] {
            let s = session(status, now - Duration::days(30));
            let e = enroll(&s);
            let due = due_reminders(&[s], &[e], &HashSet::new(), &ReminderPolicy::default(), now);
            assert!(due.is_empty(), "{status} should not produce reminders");
        }
    }

    #[test]
    fn ordered_by_session_end() {
        let now = Utc::now();
        let later = session(SessionStatus::Active, now - Duration::days(2));
        let earlier = session(SessionStatus::Active, now - Duration::days(4));
        let a = enroll(&later);
        let b = enroll(&earlier);

        let due = due_reminders(
            &[later, earlier],
            &[a.clone(), b.clone()],
            &HashSet::new(),
            &ReminderPolicy::default(),
            now,
        );
        let order: Vec<Uuid> = due.iter().map(|r| r.enrollment_id).collect();
        assert_eq!(order, vec![b.id, a.id]);
    }

    #[test]
    fn out_of_range_offsets_never_panic() {
        let now = Utc::now();
        let s = session(SessionStatus::Active, now - Duration::days(2));
        let e = enroll(&s);

        for offset_days in [200_000_000_000, -1, i64::MAX, i64::MIN] {
            let policy = ReminderPolicy {
                offset_days,
                include_completed: true,
            };
            let due = due_reminders(&[s.clone()], &[e.clone()], &HashSet::new(), &policy, now);
            assert!(due.is_empty(), "offset {offset_days} produced reminders");
        }
    }

    #[test]
    fn offset_past_the_calendar_end_is_never_due() {
        let s = session(SessionStatus::Active, DateTime::<Utc>::MAX_UTC - Duration::days(1));
        let e = enroll(&s);
        let policy = ReminderPolicy {
            offset_days: ReminderPolicy::MAX_OFFSET_DAYS,
            include_completed: true,
        };

        let due = due_reminders(&[s], &[e], &HashSet::new(), &policy, DateTime::<Utc>::MAX_UTC);
        assert!(due.is_empty());
    }
}
