//! Read-only adapters over data owned by external services: the employee
//! directory's `employee` table and the feedback service's `feedback`
//! table.

use std::collections::{HashMap, HashSet};

use emarge_core::error::AttendanceResult;
use emarge_core::repository::{EmployeeDirectory, FeedbackStore};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct EmployeeRow {
    employee_id: String,
    display_name: String,
}

#[derive(Debug, SurrealValue)]
struct FeedbackRow {
    enrollment_id: String,
}

#[derive(Clone)]
pub struct SurrealEmployeeDirectory<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEmployeeDirectory<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> EmployeeDirectory for SurrealEmployeeDirectory<C> {
    async fn display_names(&self, employee_ids: &[Uuid]) -> AttendanceResult<HashMap<Uuid, String>> {
        if employee_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT employee_id, display_name FROM employee \
                 WHERE employee_id IN $ids",
            )
            .bind(("ids", uuid_strings(employee_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EmployeeRow> = result.take(0).map_err(DbError::from)?;
        let names = rows
            .into_iter()
            .map(|row| -> Result<(Uuid, String), DbError> {
                Ok((parse_uuid("employee", &row.employee_id)?, row.display_name))
            })
            .collect::<Result<HashMap<_, _>, DbError>>()?;
        Ok(names)
    }
}

#[derive(Clone)]
pub struct SurrealFeedbackStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFeedbackStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FeedbackStore for SurrealFeedbackStore<C> {
    async fn with_feedback(&self, enrollment_ids: &[Uuid]) -> AttendanceResult<HashSet<Uuid>> {
        if enrollment_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut result = self
            .db
            .query("SELECT enrollment_id FROM feedback WHERE enrollment_id IN $ids")
            .bind(("ids", uuid_strings(enrollment_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FeedbackRow> = result.take(0).map_err(DbError::from)?;
        let ids = rows
            .into_iter()
            .map(|row| parse_uuid("enrollment", &row.enrollment_id))
            .collect::<Result<HashSet<_>, DbError>>()?;
        Ok(ids)
    }
}
