//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs and calendar dates
//! are stored as strings; enums are stored as strings with ASSERT
//! constraints. Capability tokens are only ever stored as SHA-256 digests.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "attendance_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Training sessions
-- =======================================================================
DEFINE TABLE training_session SCHEMAFULL;
DEFINE FIELD title ON TABLE training_session TYPE string;
DEFINE FIELD location ON TABLE training_session TYPE string;
DEFINE FIELD trainer_id ON TABLE training_session TYPE string;
DEFINE FIELD starts_at ON TABLE training_session TYPE datetime;
DEFINE FIELD ends_at ON TABLE training_session TYPE datetime;
DEFINE FIELD status ON TABLE training_session TYPE string \
    ASSERT $value IN ['Draft', 'NotStarted', 'Active', 'Completed', \
    'Cancelled'];
DEFINE FIELD version ON TABLE training_session TYPE int DEFAULT 0;
-- Bumped by writes that depend on the session being Active, so a
-- concurrent status change conflicts with them.
DEFINE FIELD guard_seq ON TABLE training_session TYPE int DEFAULT 0;
DEFINE FIELD token_hash ON TABLE training_session TYPE string;
DEFINE FIELD created_at ON TABLE training_session TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE training_session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE training_session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_status ON TABLE training_session \
    COLUMNS status;

-- =======================================================================
-- Status history (append-only)
-- =======================================================================
DEFINE TABLE status_history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD session_id ON TABLE status_history TYPE string;
DEFINE FIELD previous ON TABLE status_history TYPE string;
DEFINE FIELD status ON TABLE status_history TYPE string \
    ASSERT $value IN ['Draft', 'NotStarted', 'Active', 'Completed', \
    'Cancelled'];
DEFINE FIELD actor ON TABLE status_history TYPE string;
DEFINE FIELD recorded_at ON TABLE status_history TYPE datetime;
DEFINE FIELD sequence ON TABLE status_history TYPE int;
DEFINE INDEX idx_history_session_time ON TABLE status_history \
    COLUMNS session_id, recorded_at;
DEFINE INDEX idx_history_session_sequence ON TABLE status_history \
    COLUMNS session_id, sequence UNIQUE;

-- =======================================================================
-- Signature windows (per session)
-- =======================================================================
DEFINE TABLE signature_window SCHEMAFULL;
DEFINE FIELD session_id ON TABLE signature_window TYPE string;
DEFINE FIELD date ON TABLE signature_window TYPE string;
DEFINE FIELD period ON TABLE signature_window TYPE string \
    ASSERT $value IN ['Morning', 'Afternoon', 'Evening'];
DEFINE FIELD period_rank ON TABLE signature_window TYPE int;
DEFINE FIELD status ON TABLE signature_window TYPE string \
    ASSERT $value IN ['Closed', 'Open'];
DEFINE FIELD opened_at ON TABLE signature_window TYPE option<datetime>;
-- Bumped by every signature write, which conflicts with a concurrent close.
DEFINE FIELD guard_seq ON TABLE signature_window TYPE int DEFAULT 0;
DEFINE FIELD token_hash ON TABLE signature_window TYPE string;
DEFINE FIELD created_at ON TABLE signature_window TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE signature_window TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_window_slot ON TABLE signature_window \
    COLUMNS session_id, date, period UNIQUE;
DEFINE INDEX idx_window_token ON TABLE signature_window \
    COLUMNS token_hash UNIQUE;

-- =======================================================================
-- Enrollments (per session)
-- =======================================================================
DEFINE TABLE enrollment SCHEMAFULL;
DEFINE FIELD session_id ON TABLE enrollment TYPE string;
DEFINE FIELD employee_id ON TABLE enrollment TYPE string;
DEFINE FIELD token_hash ON TABLE enrollment TYPE string;
DEFINE FIELD created_at ON TABLE enrollment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_enrollment_session_employee ON TABLE enrollment \
    COLUMNS session_id, employee_id UNIQUE;
DEFINE INDEX idx_enrollment_token ON TABLE enrollment \
    COLUMNS token_hash UNIQUE;

-- =======================================================================
-- Signatures (append-only, keyed by [window_id, enrollment_id])
-- =======================================================================
DEFINE TABLE signature SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD window_id ON TABLE signature TYPE string;
DEFINE FIELD enrollment_id ON TABLE signature TYPE string;
DEFINE FIELD session_id ON TABLE signature TYPE string;
DEFINE FIELD payload ON TABLE signature TYPE string;
DEFINE FIELD signed_at ON TABLE signature TYPE datetime;
DEFINE INDEX idx_signature_key ON TABLE signature \
    COLUMNS window_id, enrollment_id UNIQUE;
DEFINE INDEX idx_signature_session ON TABLE signature \
    COLUMNS session_id;

-- =======================================================================
-- External read models (written by the directory and feedback services)
-- =======================================================================
DEFINE TABLE employee SCHEMAFULL;
DEFINE FIELD employee_id ON TABLE employee TYPE string;
DEFINE FIELD display_name ON TABLE employee TYPE string;
DEFINE INDEX idx_employee_id ON TABLE employee \
    COLUMNS employee_id UNIQUE;

DEFINE TABLE feedback SCHEMAFULL;
DEFINE FIELD enrollment_id ON TABLE feedback TYPE string;
DEFINE FIELD submitted_at ON TABLE feedback TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_feedback_enrollment ON TABLE feedback \
    COLUMNS enrollment_id UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    info!(
        version = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema up to date"
    );
    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
