//! SurrealDB implementation of [`WindowRepository`].

use chrono::{DateTime, NaiveDate, Utc};
use emarge_core::error::AttendanceResult;
use emarge_core::models::window::{NewWindow, Period, SignatureWindow, WindowStatus};
use emarge_core::repository::WindowRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{
    DbError, SESSION_INACTIVE, STALE_GUARD, is_conflict_message, transaction_failure,
};

const ENTITY: &str = "signature_window";

#[derive(Debug, SurrealValue)]
struct WindowRow {
    record_id: String,
    session_id: String,
    date: String,
    period: String,
    status: String,
    opened_at: Option<DateTime<Utc>>,
    token_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WindowRow {
    fn try_into_window(self) -> Result<SignatureWindow, DbError> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| DbError::Decode(format!("invalid window date: {e}")))?;
        let period = self.period.parse::<Period>().map_err(DbError::Decode)?;
        let status = WindowStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown window status: {}", self.status)))?;
        Ok(SignatureWindow {
            id: parse_uuid("window", &self.record_id)?,
            session_id: parse_uuid("session", &self.session_id)?,
            date,
            period,
            status,
            opened_at: self.opened_at,
            token_hash: self.token_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_window(rows: Vec<WindowRow>, id: impl ToString) -> Result<SignatureWindow, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .try_into_window()
}

/// SurrealDB implementation of the signature window repository.
#[derive(Clone)]
pub struct SurrealWindowRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWindowRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WindowRepository for SurrealWindowRepository<C> {
    async fn create(&self, input: NewWindow) -> AttendanceResult<SignatureWindow> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('signature_window', $id) SET \
                 session_id = $session_id, \
                 date = $date, \
                 period = $period, \
                 period_rank = $period_rank, \
                 status = 'Closed', \
                 opened_at = NONE, \
                 token_hash = $token_hash; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('signature_window', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("session_id", input.session_id.to_string()))
            .bind(("date", input.date.format("%Y-%m-%d").to_string()))
            .bind(("period", input.period.as_str().to_string()))
            .bind(("period_rank", input.period.rank() as u32))
            .bind(("token_hash", input.token_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, ENTITY))?;

        let rows: Vec<WindowRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_window(rows, id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> AttendanceResult<SignatureWindow> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('signature_window', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WindowRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_window(rows, id_str)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> AttendanceResult<SignatureWindow> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM signature_window \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WindowRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_window(rows, "token_hash")?)
    }

    async fn list_by_session(&self, session_id: Uuid) -> AttendanceResult<Vec<SignatureWindow>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM signature_window \
                 WHERE session_id = $session_id \
                 ORDER BY date ASC, period_rank ASC",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WindowRow> = result.take(0).map_err(DbError::from)?;
        let windows = rows
            .into_iter()
            .map(WindowRow::try_into_window)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(windows)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: WindowStatus,
        to: WindowStatus,
        at: DateTime<Utc>,
    ) -> AttendanceResult<Option<SignatureWindow>> {
        let current = self.get_by_id(id).await?;

        // Opening also writes the owning session, guarded on it being
        // Active, so a concurrent cancel or complete conflicts with it.
        let (session_guard, opened_at) = if to == WindowStatus::Open {
            (
                format!(
                    "LET $live = (UPDATE type::record('training_session', $session_id) \
                     SET guard_seq += 1 WHERE status = 'Active'); \
                     IF array::len($live) = 0 {{ THROW '{SESSION_INACTIVE}'; }}; "
                ),
                ", opened_at = opened_at ?? $at",
            )
        } else {
            (String::new(), "")
        };
        let query = format!(
            "BEGIN TRANSACTION; \
             {session_guard}\
             LET $moved = (UPDATE type::record('signature_window', $id) \
                 SET status = $to, updated_at = $at{opened_at} \
                 WHERE status = $expected); \
             IF array::len($moved) = 0 {{ THROW '{STALE_GUARD}'; }}; \
             COMMIT TRANSACTION;"
        );

        let response = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("session_id", current.session_id.to_string()))
            .bind(("expected", expected.as_str().to_string()))
            .bind(("to", to.as_str().to_string()))
            .bind(("at", at))
            .await;

        match transaction_failure(response) {
            None => Ok(Some(self.get_by_id(id).await?)),
            Some(message)
                if message.contains(SESSION_INACTIVE) || is_conflict_message(&message) =>
            {
                Ok(None)
            }
            Some(message) => Err(DbError::Query(message).into()),
        }
    }
}
