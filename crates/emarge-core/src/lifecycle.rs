//! Session status transition function.
//!
//! This is the only place that decides which status follows which. The
//! service layer plans a [`TransitionCommit`] here and hands it to the
//! repository, which applies status and history together.
//!
//! ```text
//! Draft --schedule--> NotStarted --open--> Active --complete--> Completed
//!   \                     |                  |
//!    `-------cancel-------+------cancel------+--> Cancelled
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AttendanceError, AttendanceResult};
use crate::models::history::{StatusHistoryEntry, TransitionCommit};
use crate::models::session::{Session, SessionStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SessionAction {
    Schedule,
    Open,
    Complete,
    Cancel,
}

impl SessionAction {
    pub const ALL: [SessionAction; 4] = [
        SessionAction::Schedule,
        SessionAction::Open,
        SessionAction::Complete,
        SessionAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Schedule => "schedule",
            SessionAction::Open => "open",
            SessionAction::Complete => "complete",
            SessionAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reached by applying `action` in `from`, if that edge exists.
pub fn next_status(from: SessionStatus, action: SessionAction) -> AttendanceResult<SessionStatus> {
    use SessionAction as A;
    use SessionStatus as S;

    match (from, action) {
        (S::Draft, A::Schedule) => Ok(S::NotStarted),
        (S::NotStarted, A::Open) => Ok(S::Active),
        (S::Active, A::Complete) => Ok(S::Completed),
        (S::Draft | S::NotStarted | S::Active, A::Cancel) => Ok(S::Cancelled),
        _ => Err(AttendanceError::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        }),
    }
}

/// Plan the status change and its history entry for `session`.
pub fn plan_transition(
    session: &Session,
    action: SessionAction,
    actor: &str,
    at: DateTime<Utc>,
) -> AttendanceResult<TransitionCommit> {
    let status = next_status(session.status, action)?;
    Ok(TransitionCommit {
        expected_version: session.version,
        entry: StatusHistoryEntry {
            id: Uuid::new_v4(),
            session_id: session.id,
            previous: session.status,
            status,
            actor: actor.to_string(),
            recorded_at: at,
            sequence: session.version + 1,
        },
    })
}

/// The session as it looks once `commit` has been applied.
pub fn apply_commit(session: Session, commit: &TransitionCommit) -> Session {
    Session {
        status: commit.entry.status,
        version: commit.entry.sequence,
        updated_at: commit.entry.recorded_at,
        ..session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            title: "Fire safety".into(),
            location: "Room 4".into(),
            trainer_id: Uuid::new_v4(),
            starts_at: now,
            ends_at: now,
            status,
            version: 4,
            token_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn allowed_edges() {
        use SessionAction as A;
        use SessionStatus as S;

        let allowed = [
            (S::Draft, A::Schedule, S::NotStarted),
            (S::NotStarted, A::Open, S::Active),
            (S::Active, A::Complete, S::Completed),
            (S::Draft, A::Cancel, S::Cancelled),
            (S::NotStarted, A::Cancel, S::Cancelled),
            (S::Active, A::Cancel, S::Cancelled),
        ];

        for from in SessionStatus::ALL {
            for action in SessionAction::ALL {
                let expected = allowed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                match (next_status(from, action), expected) {
                    (Ok(to), Some(want)) => assert_eq!(to, want, "{from} --{action}-->"),
                    (Err(AttendanceError::InvalidTransition { .. }), None) => {}
                    (got, want) => panic!("{from} --{action}-->: got {got:?}, want {want:?}"),
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [SessionStatus::Completed, SessionStatus::Cancelled] {
            assert!(from.is_terminal());
            for action in SessionAction::ALL {
                assert!(next_status(from, action).is_err());
            }
        }
    }

    #[test]
    fn open_from_draft_is_rejected() {
        let err = next_status(SessionStatus::Draft, SessionAction::Open).unwrap_err();
        assert_eq!(err.to_string(), "Invalid transition: cannot open from Draft");
    }

    #[test]
    fn plan_carries_history_effect() {
        let s = session(SessionStatus::NotStarted);
        let at = Utc::now();
        let commit = plan_transition(&s, SessionAction::Open, "admin@corp", at).unwrap();

        assert_eq!(commit.expected_version, 4);
        assert_eq!(commit.entry.session_id, s.id);
        assert_eq!(commit.entry.previous, SessionStatus::NotStarted);
        assert_eq!(commit.entry.status, SessionStatus::Active);
        assert_eq!(commit.entry.actor, "admin@corp");
        assert_eq!(commit.entry.sequence, 5);

        let applied = apply_commit(s, &commit);
        assert_eq!(applied.status, SessionStatus::Active);
        assert_eq!(applied.version, 5);
        assert_eq!(applied.updated_at, at);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in SessionStatus::ALL {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("Paused"), None);
    }
}
