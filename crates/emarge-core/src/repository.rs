//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Writes that carry invariants
//! (session transitions, signature inserts) state their atomicity
//! requirements on the trait method; implementations must uphold them at
//! the storage layer rather than relying on callers.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AttendanceResult;
use crate::models::{
    enrollment::{Enrollment, NewEnrollment},
    history::{StatusHistoryEntry, TransitionCommit},
    session::{NewSession, Session, SessionStatus},
    signature::{NewSignature, SignatureInsert, SignatureKey, SignatureRecord},
    window::{NewWindow, SignatureWindow, WindowStatus},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// Page an already materialized, ordered list.
    pub fn from_vec(items: Vec<T>, pagination: &Pagination) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Self {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Owned repositories
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: NewSession) -> impl Future<Output = AttendanceResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AttendanceResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = AttendanceResult<Session>> + Send;
    fn list_by_status(
        &self,
        statuses: &[SessionStatus],
    ) -> impl Future<Output = AttendanceResult<Vec<Session>>> + Send;

    /// Apply a status change and append its history entry atomically.
    ///
    /// Fails with `Conflict` when the session is no longer at
    /// `commit.expected_version`; in that case neither write happens.
    fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> impl Future<Output = AttendanceResult<()>> + Send;

    /// History entries ordered by timestamp, then sequence.
    fn history(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = AttendanceResult<Vec<StatusHistoryEntry>>> + Send;
}

pub trait WindowRepository: Send + Sync {
    fn create(
        &self,
        input: NewWindow,
    ) -> impl Future<Output = AttendanceResult<SignatureWindow>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AttendanceResult<SignatureWindow>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = AttendanceResult<SignatureWindow>> + Send;

    /// Windows of a session ordered by date, then period.
    fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = AttendanceResult<Vec<SignatureWindow>>> + Send;

    /// Conditionally move a window from `expected` to `to`.
    ///
    /// Opening additionally requires the owning session to be Active at
    /// the moment of the write, and stamps `opened_at` if it has never been
    /// set. Returns `Ok(None)` when the window exists but either guard no
    /// longer holds.
    fn transition_status(
        &self,
        id: Uuid,
        expected: WindowStatus,
        to: WindowStatus,
        at: DateTime<Utc>,
    ) -> impl Future<Output = AttendanceResult<Option<SignatureWindow>>> + Send;
}

pub trait EnrollmentRepository: Send + Sync {
    fn create(
        &self,
        input: NewEnrollment,
    ) -> impl Future<Output = AttendanceResult<Enrollment>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AttendanceResult<Enrollment>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = AttendanceResult<Enrollment>> + Send;

    /// Enrollments of a session in creation order.
    fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = AttendanceResult<Vec<Enrollment>>> + Send;

    /// Enrollments of several sessions in one read.
    fn list_by_sessions(
        &self,
        session_ids: &[Uuid],
    ) -> impl Future<Output = AttendanceResult<Vec<Enrollment>>> + Send;
}

pub trait SignatureRepository: Send + Sync {
    /// Store a signature unless one already exists for its key.
    ///
    /// Must be atomic at the storage layer: concurrent inserts for the
    /// same key all succeed and all observe the single stored record.
    /// Fails with `WindowClosed` when the window is not Open at the moment
    /// of the write; a concurrent close and insert never both commit.
    fn insert_if_absent(
        &self,
        input: NewSignature,
    ) -> impl Future<Output = AttendanceResult<SignatureInsert>> + Send;
    fn get(
        &self,
        key: SignatureKey,
    ) -> impl Future<Output = AttendanceResult<Option<SignatureRecord>>> + Send;

    /// Every signature key recorded for a session, in one read.
    fn list_keys_by_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = AttendanceResult<Vec<SignatureKey>>> + Send;

    /// Enrollment ids holding a signature for the window.
    fn signed_enrollment_ids(
        &self,
        window_id: Uuid,
    ) -> impl Future<Output = AttendanceResult<Vec<Uuid>>> + Send;
}

/// The set of repositories a service layer works against.
pub trait AttendanceStore: Send + Sync {
    type Sessions: SessionRepository;
    type Windows: WindowRepository;
    type Enrollments: EnrollmentRepository;
    type Signatures: SignatureRepository;

    fn sessions(&self) -> &Self::Sessions;
    fn windows(&self) -> &Self::Windows;
    fn enrollments(&self) -> &Self::Enrollments;
    fn signatures(&self) -> &Self::Signatures;
}

// ---------------------------------------------------------------------------
// Consumed collaborators
// ---------------------------------------------------------------------------

/// Resolves employees to the name shown on a sign-in sheet.
pub trait EmployeeDirectory: Send + Sync {
    /// Employees missing from the directory are absent from the map.
    fn display_names(
        &self,
        employee_ids: &[Uuid],
    ) -> impl Future<Output = AttendanceResult<HashMap<Uuid, String>>> + Send;
}

/// Source of the `has_feedback` flag.
pub trait FeedbackStore: Send + Sync {
    /// The subset of `enrollment_ids` that have submitted feedback.
    fn with_feedback(
        &self,
        enrollment_ids: &[Uuid],
    ) -> impl Future<Output = AttendanceResult<HashSet<Uuid>>> + Send;
}
