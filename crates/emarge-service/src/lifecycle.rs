//! Session lifecycle service: creation, status transitions and history.

use chrono::Utc;
use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::lifecycle::{SessionAction, apply_commit, plan_transition};
use emarge_core::models::Issued;
use emarge_core::models::history::StatusHistoryEntry;
use emarge_core::models::session::{CreateSession, NewSession, Session};
use emarge_core::repository::{AttendanceStore, SessionRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::token;

/// Owns session status. No other service writes it.
pub struct SessionLifecycle<R: AttendanceStore> {
    store: R,
    config: ServiceConfig,
}

impl<R: AttendanceStore> SessionLifecycle<R> {
    pub fn new(store: R, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Create a session in Draft and issue its session-scope token.
    pub async fn create_session(&self, input: CreateSession) -> AttendanceResult<Issued<Session>> {
        if input.title.trim().is_empty() {
            return Err(AttendanceError::validation("title must not be empty"));
        }
        if input.location.trim().is_empty() {
            return Err(AttendanceError::validation("location must not be empty"));
        }
        if input.ends_at <= input.starts_at {
            return Err(AttendanceError::validation("session must end after it starts"));
        }

        let (raw, token_hash) = token::issue();
        let session = self
            .store
            .sessions()
            .create(NewSession {
                title: input.title,
                location: input.location,
                trainer_id: input.trainer_id,
                starts_at: input.starts_at,
                ends_at: input.ends_at,
                token_hash,
            })
            .await?;

        info!(session_id = %session.id, "Session created");
        Ok(Issued {
            entity: session,
            token: raw,
        })
    }

    pub async fn get_session(&self, id: Uuid) -> AttendanceResult<Session> {
        self.store.sessions().get_by_id(id).await
    }

    pub async fn schedule(&self, id: Uuid, actor: &str) -> AttendanceResult<Session> {
        self.transition(id, SessionAction::Schedule, actor).await
    }

    pub async fn open(&self, id: Uuid, actor: &str) -> AttendanceResult<Session> {
        self.transition(id, SessionAction::Open, actor).await
    }

    pub async fn complete(&self, id: Uuid, actor: &str) -> AttendanceResult<Session> {
        self.transition(id, SessionAction::Complete, actor).await
    }

    /// Valid from Draft, NotStarted and Active.
    pub async fn cancel(&self, id: Uuid, actor: &str) -> AttendanceResult<Session> {
        self.transition(id, SessionAction::Cancel, actor).await
    }

    /// Apply `action`, re-reading and retrying on `Conflict` up to
    /// `max_transition_attempts` times. `InvalidTransition` is final.
    pub async fn transition(
        &self,
        id: Uuid,
        action: SessionAction,
        actor: &str,
    ) -> AttendanceResult<Session> {
        let max_attempts = self.config.max_transition_attempts.max(1);
        let mut attempt = 1;

        loop {
            let session = self.store.sessions().get_by_id(id).await?;
            let commit = plan_transition(&session, action, actor, Utc::now())?;

            match self.store.sessions().commit_transition(commit.clone()).await {
                Ok(()) => {
                    info!(
                        session_id = %id,
                        %action,
                        from = %commit.entry.previous,
                        to = %commit.entry.status,
                        actor,
                        "Session transitioned"
                    );
                    return Ok(apply_commit(session, &commit));
                }
                Err(AttendanceError::Conflict { .. }) if attempt < max_attempts => {
                    warn!(session_id = %id, %action, attempt, "Transition conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn history(&self, id: Uuid) -> AttendanceResult<Vec<StatusHistoryEntry>> {
        // Surface NotFound for unknown sessions rather than an empty list.
        self.store.sessions().get_by_id(id).await?;
        self.store.sessions().history(id).await
    }
}
