//! SurrealDB implementation of [`SignatureRepository`].
//!
//! Each signature lives at the record id `signature:[window_id,
//! enrollment_id]`, so the composite key is the primary key itself and
//! `INSERT IGNORE` gives an atomic insert-if-absent. A unique index on the
//! same two columns backs it up. The insert only commits while the window
//! is Open.

use chrono::{DateTime, Utc};
use emarge_core::error::AttendanceResult;
use emarge_core::models::signature::{
    NewSignature, SignatureInsert, SignatureKey, SignatureRecord,
};
use emarge_core::repository::SignatureRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::{
    DbError, SLOT_TAKEN, WINDOW_NOT_OPEN, is_conflict_message, transaction_failure,
};

/// Attempts at a signature write that keeps losing to other writes in the
/// same window.
const MAX_INSERT_ATTEMPTS: u32 = 5;

enum GuardedInsert {
    Stored,
    Taken,
    Conflict(String),
    Failed(String),
}

#[derive(Debug, SurrealValue)]
struct SignatureRow {
    window_id: String,
    enrollment_id: String,
    session_id: String,
    payload: String,
    signed_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct KeyRow {
    window_id: String,
    enrollment_id: String,
}

#[derive(Debug, SurrealValue)]
struct EnrollmentIdRow {
    enrollment_id: String,
}

impl SignatureRow {
    fn try_into_record(self) -> Result<SignatureRecord, DbError> {
        Ok(SignatureRecord {
            window_id: parse_uuid("window", &self.window_id)?,
            enrollment_id: parse_uuid("enrollment", &self.enrollment_id)?,
            session_id: parse_uuid("session", &self.session_id)?,
            payload: self.payload,
            signed_at: self.signed_at,
        })
    }
}

impl KeyRow {
    fn try_into_key(self) -> Result<SignatureKey, DbError> {
        Ok(SignatureKey {
            window_id: parse_uuid("window", &self.window_id)?,
            enrollment_id: parse_uuid("enrollment", &self.enrollment_id)?,
        })
    }
}

/// SurrealDB implementation of the signature ledger.
#[derive(Clone)]
pub struct SurrealSignatureRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSignatureRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Store the record in one transaction that also requires the window
    /// to be Open and bumps its `guard_seq`, so a concurrent close and this
    /// write cannot both commit.
    async fn insert_guarded(&self, input: &NewSignature) -> Result<GuardedInsert, DbError> {
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $open = (UPDATE type::record('signature_window', $window_id) \
                 SET guard_seq += 1 WHERE status = 'Open'); \
             IF array::len($open) = 0 {{ THROW '{WINDOW_NOT_OPEN}'; }}; \
             LET $stored = (INSERT IGNORE INTO signature {{ \
                 id: type::record('signature', [$window_id, $enrollment_id]), \
                 window_id: $window_id, \
                 enrollment_id: $enrollment_id, \
                 session_id: $session_id, \
                 payload: $payload, \
                 signed_at: $signed_at }}); \
             IF array::len($stored) = 0 {{ THROW '{SLOT_TAKEN}'; }}; \
             COMMIT TRANSACTION;"
        );

        let response = self
            .db
            .query(query)
            .bind(("window_id", input.window_id.to_string()))
            .bind(("enrollment_id", input.enrollment_id.to_string()))
            .bind(("session_id", input.session_id.to_string()))
            .bind(("payload", input.payload.clone()))
            .bind(("signed_at", input.signed_at))
            .await;

        let Some(message) = transaction_failure(response) else {
            return Ok(GuardedInsert::Stored);
        };
        if message.contains(WINDOW_NOT_OPEN) {
            return Err(DbError::WindowClosed {
                id: input.window_id.to_string(),
            });
        }
        if message.contains(SLOT_TAKEN) {
            return Ok(GuardedInsert::Taken);
        }
        if is_conflict_message(&message) {
            return Ok(GuardedInsert::Conflict(message));
        }
        // A racing insert can also surface as a unique index violation.
        Ok(GuardedInsert::Failed(message))
    }

    async fn fetch(&self, key: SignatureKey) -> Result<Option<SignatureRecord>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('signature', \
                 [$window_id, $enrollment_id])",
            )
            .bind(("window_id", key.window_id.to_string()))
            .bind(("enrollment_id", key.enrollment_id.to_string()))
            .await?;

        let rows: Vec<SignatureRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(SignatureRow::try_into_record)
            .transpose()
    }
}

impl<C: Connection> SignatureRepository for SurrealSignatureRepository<C> {
    async fn insert_if_absent(&self, input: NewSignature) -> AttendanceResult<SignatureInsert> {
        let key = SignatureKey {
            window_id: input.window_id,
            enrollment_id: input.enrollment_id,
        };
        let missing = || DbError::not_found("signature", format!("{key:?}"));

        let mut attempt = 1;
        loop {
            match self.insert_guarded(&input).await? {
                GuardedInsert::Stored => {
                    let record = self.fetch(key).await?.ok_or_else(missing)?;
                    return Ok(SignatureInsert::Created(record));
                }
                GuardedInsert::Taken => {
                    let record = self.fetch(key).await?.ok_or_else(missing)?;
                    return Ok(SignatureInsert::Existing(record));
                }
                // Another signature in the same window committed first; the
                // winner may have been for this very key.
                GuardedInsert::Conflict(message) => {
                    if let Some(existing) = self.fetch(key).await? {
                        return Ok(SignatureInsert::Existing(existing));
                    }
                    if attempt >= MAX_INSERT_ATTEMPTS {
                        return Err(DbError::Conflict {
                            entity: "signature_window".into(),
                            id: key.window_id.to_string(),
                        }
                        .into());
                    }
                    debug!(
                        window_id = %key.window_id,
                        enrollment_id = %key.enrollment_id,
                        attempt,
                        error = %message,
                        "Signature insert conflicted, retrying"
                    );
                    attempt += 1;
                }
                GuardedInsert::Failed(message) => {
                    if let Some(existing) = self.fetch(key).await? {
                        return Ok(SignatureInsert::Existing(existing));
                    }
                    return Err(DbError::Query(message).into());
                }
            }
        }
    }

    async fn get(&self, key: SignatureKey) -> AttendanceResult<Option<SignatureRecord>> {
        Ok(self.fetch(key).await?)
    }

    async fn list_keys_by_session(&self, session_id: Uuid) -> AttendanceResult<Vec<SignatureKey>> {
        let mut result = self
            .db
            .query(
                "SELECT window_id, enrollment_id FROM signature \
                 WHERE session_id = $session_id",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<KeyRow> = result.take(0).map_err(DbError::from)?;
        let keys = rows
            .into_iter()
            .map(KeyRow::try_into_key)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(keys)
    }

    async fn signed_enrollment_ids(&self, window_id: Uuid) -> AttendanceResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query("SELECT enrollment_id FROM signature WHERE window_id = $window_id")
            .bind(("window_id", window_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentIdRow> = result.take(0).map_err(DbError::from)?;
        let ids = rows
            .into_iter()
            .map(|row| parse_uuid("enrollment", &row.enrollment_id))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(ids)
    }
}
