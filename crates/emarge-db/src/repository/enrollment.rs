//! SurrealDB implementation of [`EnrollmentRepository`].

use chrono::{DateTime, Utc};
use emarge_core::error::AttendanceResult;
use emarge_core::models::enrollment::{Enrollment, NewEnrollment};
use emarge_core::repository::EnrollmentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, uuid_strings};
use crate::error::DbError;

const ENTITY: &str = "enrollment";

#[derive(Debug, SurrealValue)]
struct EnrollmentRow {
    record_id: String,
    session_id: String,
    employee_id: String,
    token_hash: String,
    created_at: DateTime<Utc>,
}

impl EnrollmentRow {
    fn try_into_enrollment(self) -> Result<Enrollment, DbError> {
        Ok(Enrollment {
            id: parse_uuid("enrollment", &self.record_id)?,
            session_id: parse_uuid("session", &self.session_id)?,
            employee_id: parse_uuid("employee", &self.employee_id)?,
            token_hash: self.token_hash,
            created_at: self.created_at,
        })
    }
}

fn collect(rows: Vec<EnrollmentRow>) -> Result<Vec<Enrollment>, DbError> {
    rows.into_iter()
        .map(EnrollmentRow::try_into_enrollment)
        .collect()
}

fn first_enrollment(rows: Vec<EnrollmentRow>, id: impl ToString) -> Result<Enrollment, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(ENTITY, id))?
        .try_into_enrollment()
}

/// SurrealDB implementation of the Enrollment repository.
#[derive(Clone)]
pub struct SurrealEnrollmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEnrollmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> EnrollmentRepository for SurrealEnrollmentRepository<C> {
    async fn create(&self, input: NewEnrollment) -> AttendanceResult<Enrollment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('enrollment', $id) SET \
                 session_id = $session_id, \
                 employee_id = $employee_id, \
                 token_hash = $token_hash; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('enrollment', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("session_id", input.session_id.to_string()))
            .bind(("employee_id", input.employee_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, ENTITY))?;

        let rows: Vec<EnrollmentRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_enrollment(rows, id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> AttendanceResult<Enrollment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('enrollment', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_enrollment(rows, id_str)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> AttendanceResult<Enrollment> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM enrollment \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_enrollment(rows, "token_hash")?)
    }

    async fn list_by_session(&self, session_id: Uuid) -> AttendanceResult<Vec<Enrollment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM enrollment \
                 WHERE session_id = $session_id \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn list_by_sessions(&self, session_ids: &[Uuid]) -> AttendanceResult<Vec<Enrollment>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM enrollment \
                 WHERE session_id IN $session_ids \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(("session_ids", uuid_strings(session_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}
