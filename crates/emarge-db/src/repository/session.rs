//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use emarge_core::error::AttendanceResult;
use emarge_core::models::history::{StatusHistoryEntry, TransitionCommit};
use emarge_core::models::session::{NewSession, Session, SessionStatus};
use emarge_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{DbError, STALE_GUARD, is_conflict};

const ENTITY: &str = "training_session";

#[derive(Debug, SurrealValue)]
struct SessionRow {
    record_id: String,
    title: String,
    location: String,
    trainer_id: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    status: String,
    version: u64,
    token_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct HistoryRow {
    record_id: String,
    session_id: String,
    previous: String,
    status: String,
    actor: String,
    recorded_at: DateTime<Utc>,
    sequence: u64,
}

fn parse_status(s: &str) -> Result<SessionStatus, DbError> {
    SessionStatus::parse(s).ok_or_else(|| DbError::Decode(format!("unknown session status: {s}")))
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid("session", &self.record_id)?,
            title: self.title,
            location: self.location,
            trainer_id: parse_uuid("trainer", &self.trainer_id)?,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            status: parse_status(&self.status)?,
            version: self.version,
            token_hash: self.token_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl HistoryRow {
    fn try_into_entry(self) -> Result<StatusHistoryEntry, DbError> {
        Ok(StatusHistoryEntry {
            id: parse_uuid("history", &self.record_id)?,
            session_id: parse_uuid("session", &self.session_id)?,
            previous: parse_status(&self.previous)?,
            status: parse_status(&self.status)?,
            actor: self.actor,
            recorded_at: self.recorded_at,
            sequence: self.sequence,
        })
    }
}

fn first_session(rows: Vec<SessionRow>, id: impl ToString) -> Result<Session, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .try_into_session()
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: NewSession) -> AttendanceResult<Session> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('training_session', $id) SET \
                 title = $title, \
                 location = $location, \
                 trainer_id = $trainer_id, \
                 starts_at = $starts_at, \
                 ends_at = $ends_at, \
                 status = 'Draft', \
                 version = 0, \
                 token_hash = $token_hash; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('training_session', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("title", input.title))
            .bind(("location", input.location))
            .bind(("trainer_id", input.trainer_id.to_string()))
            .bind(("starts_at", input.starts_at))
            .bind(("ends_at", input.ends_at))
            .bind(("token_hash", input.token_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, ENTITY))?;

        // Statement 0 is the CREATE, statement 1 re-reads with the id.
        let rows: Vec<SessionRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_session(rows, id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> AttendanceResult<Session> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('training_session', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_session(rows, id_str)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> AttendanceResult<Session> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM training_session \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_session(rows, "token_hash")?)
    }

    async fn list_by_status(&self, statuses: &[SessionStatus]) -> AttendanceResult<Vec<Session>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM training_session \
                 WHERE status IN $statuses \
                 ORDER BY ends_at ASC",
            )
            .bind(("statuses", statuses))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let sessions = rows
            .into_iter()
            .map(SessionRow::try_into_session)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(sessions)
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> AttendanceResult<()> {
        let entry = commit.entry;
        let session_id = entry.session_id.to_string();

        // The guarded UPDATE and the history CREATE share one transaction;
        // when the guard matches nothing the THROW rolls both back.
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $updated = (UPDATE type::record('training_session', $id) SET \
                 status = $status, version = $sequence, updated_at = $recorded_at \
                 WHERE status = $previous AND version = $expected_version); \
             IF array::len($updated) = 0 {{ THROW '{STALE_GUARD}'; }}; \
             CREATE type::record('status_history', $history_id) SET \
                 session_id = $id, previous = $previous, status = $status, \
                 actor = $actor, recorded_at = $recorded_at, sequence = $sequence; \
             COMMIT TRANSACTION;"
        );

        let response = self
            .db
            .query(query)
            .bind(("id", session_id.clone()))
            .bind(("history_id", entry.id.to_string()))
            .bind(("previous", entry.previous.as_str().to_string()))
            .bind(("status", entry.status.as_str().to_string()))
            .bind(("expected_version", commit.expected_version))
            .bind(("sequence", entry.sequence))
            .bind(("actor", entry.actor))
            .bind(("recorded_at", entry.recorded_at))
            .await;

        let outcome = match response {
            Ok(response) => response.check().map(|_| ()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if is_conflict(&e) => Err(DbError::Conflict {
                entity: ENTITY.into(),
                id: session_id,
            }
            .into()),
            Err(e) => Err(DbError::Query(e.to_string()).into()),
        }
    }

    async fn history(&self, session_id: Uuid) -> AttendanceResult<Vec<StatusHistoryEntry>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM status_history \
                 WHERE session_id = $session_id \
                 ORDER BY recorded_at ASC, sequence ASC",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HistoryRow> = result.take(0).map_err(DbError::from)?;
        let entries = rows
            .into_iter()
            .map(HistoryRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(entries)
    }
}
