//! Session lifecycle through the service layer.

mod common;

use chrono::{Duration, Utc};
use common::{TRAINER, harness, new_session_at};
use emarge_core::error::AttendanceError;
use emarge_core::models::session::SessionStatus;
use emarge_service::token::{hash_token, is_well_formed};

#[tokio::test]
async fn create_starts_in_draft_with_token() {
    let h = harness().await;
    let issued = h.draft().await;

    assert_eq!(issued.entity.status, SessionStatus::Draft);
    assert_eq!(issued.entity.version, 0);
    assert!(is_well_formed(&issued.token));
    assert_eq!(issued.entity.token_hash, hash_token(&issued.token));
    assert!(h.lifecycle.history(issued.entity.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_rejects_inverted_times() {
    let h = harness().await;
    let start = Utc::now();

    let result = h
        .lifecycle
        .create_session(new_session_at(start, start - Duration::hours(1)))
        .await;
    assert!(matches!(result, Err(AttendanceError::Validation { .. })));

    let mut input = new_session_at(start, start + Duration::hours(1));
    input.location = "  ".into();
    let result = h.lifecycle.create_session(input).await;
    assert!(matches!(result, Err(AttendanceError::Validation { .. })));
}

#[tokio::test]
async fn full_lifecycle_records_history_in_order() {
    let h = harness().await;
    let id = h.draft().await.entity.id;

    let s = h.lifecycle.schedule(id, TRAINER).await.unwrap();
    assert_eq!(s.status, SessionStatus::NotStarted);
    let s = h.lifecycle.open(id, TRAINER).await.unwrap();
    assert_eq!(s.status, SessionStatus::Active);
    let s = h.lifecycle.complete(id, "trainer:claire").await.unwrap();
    assert_eq!(s.status, SessionStatus::Completed);
    assert_eq!(s.version, 3);

    let stored = h.lifecycle.get_session(id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);

    let history = h.lifecycle.history(id).await.unwrap();
    let steps: Vec<(SessionStatus, SessionStatus)> =
        history.iter().map(|e| (e.previous, e.status)).collect();
    assert_eq!(
        steps,
        vec![
            (SessionStatus::Draft, SessionStatus::NotStarted),
            (SessionStatus::NotStarted, SessionStatus::Active),
            (SessionStatus::Active, SessionStatus::Completed),
        ]
    );
    assert_eq!(history[2].actor, "trainer:claire");
    assert!(history.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[tokio::test]
async fn cancel_from_active() {
    let h = harness().await;
    let id = h.active().await.entity.id;

    let s = h.lifecycle.cancel(id, TRAINER).await.unwrap();
    assert_eq!(s.status, SessionStatus::Cancelled);

    let open = h.lifecycle.open(id, TRAINER).await;
    assert!(matches!(open, Err(AttendanceError::InvalidTransition { .. })));
    let complete = h.lifecycle.complete(id, TRAINER).await;
    assert!(matches!(complete, Err(AttendanceError::InvalidTransition { .. })));

    let history = h.lifecycle.history(id).await.unwrap();
    assert_eq!(history.len(), 3);
    let last = history.last().unwrap();
    assert_eq!(last.previous, SessionStatus::Active);
    assert_eq!(last.status, SessionStatus::Cancelled);
    assert_eq!(
        h.lifecycle.get_session(id).await.unwrap().status,
        SessionStatus::Cancelled
    );
}

#[tokio::test]
async fn cancel_from_draft_and_not_started() {
    let h = harness().await;

    let draft = h.draft().await.entity.id;
    let s = h.lifecycle.cancel(draft, TRAINER).await.unwrap();
    assert_eq!(s.status, SessionStatus::Cancelled);

    let scheduled = h.draft().await.entity.id;
    h.lifecycle.schedule(scheduled, TRAINER).await.unwrap();
    let s = h.lifecycle.cancel(scheduled, TRAINER).await.unwrap();
    assert_eq!(s.status, SessionStatus::Cancelled);
}

#[tokio::test]
async fn invalid_transition_leaves_state_untouched() {
    let h = harness().await;
    let id = h.draft().await.entity.id;

    let err = h.lifecycle.open(id, TRAINER).await.unwrap_err();
    assert!(matches!(err, AttendanceError::InvalidTransition { .. }));
    assert_eq!(err.to_string(), "Invalid transition: cannot open from Draft");

    let stored = h.lifecycle.get_session(id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Draft);
    assert_eq!(stored.version, 0);
    assert!(h.lifecycle.history(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn terminal_sessions_accept_nothing() {
    let h = harness().await;
    let id = h.active().await.entity.id;
    h.lifecycle.complete(id, TRAINER).await.unwrap();

    for result in [
        h.lifecycle.cancel(id, TRAINER).await,
        h.lifecycle.open(id, TRAINER).await,
        h.lifecycle.complete(id, TRAINER).await,
        h.lifecycle.schedule(id, TRAINER).await,
    ] {
        assert!(matches!(result, Err(AttendanceError::InvalidTransition { .. })));
    }
    assert_eq!(h.lifecycle.history(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn concurrent_open_has_single_winner() {
    let h = harness().await;
    let id = h.draft().await.entity.id;
    h.lifecycle.schedule(id, TRAINER).await.unwrap();

    let (a, b) = tokio::join!(
        h.lifecycle.open(id, "trainer:a"),
        h.lifecycle.open(id, "trainer:b"),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let failure = if a.is_ok() { b } else { a };
    assert!(matches!(
        failure,
        Err(AttendanceError::InvalidTransition { .. })
    ));

    let history = h.lifecycle.history(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].status, SessionStatus::Active);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let h = harness().await;
    let id = uuid::Uuid::new_v4();

    assert!(matches!(
        h.lifecycle.schedule(id, TRAINER).await,
        Err(AttendanceError::NotFound { .. })
    ));
    assert!(matches!(
        h.lifecycle.history(id).await,
        Err(AttendanceError::NotFound { .. })
    ));
}
