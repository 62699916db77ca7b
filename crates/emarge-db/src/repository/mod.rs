//! SurrealDB repository implementations.

mod directory;
mod enrollment;
mod session;
mod signature;
mod window;

use emarge_core::repository::AttendanceStore;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use crate::error::DbError;

pub use directory::{SurrealEmployeeDirectory, SurrealFeedbackStore};
pub use enrollment::SurrealEnrollmentRepository;
pub use session::SurrealSessionRepository;
pub use signature::SurrealSignatureRepository;
pub use window::SurrealWindowRepository;

/// All attendance repositories over one SurrealDB handle.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    sessions: SurrealSessionRepository<C>,
    windows: SurrealWindowRepository<C>,
    enrollments: SurrealEnrollmentRepository<C>,
    signatures: SurrealSignatureRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            sessions: SurrealSessionRepository::new(db.clone()),
            windows: SurrealWindowRepository::new(db.clone()),
            enrollments: SurrealEnrollmentRepository::new(db.clone()),
            signatures: SurrealSignatureRepository::new(db),
        }
    }
}

impl<C: Connection> AttendanceStore for SurrealStore<C> {
    type Sessions = SurrealSessionRepository<C>;
    type Windows = SurrealWindowRepository<C>;
    type Enrollments = SurrealEnrollmentRepository<C>;
    type Signatures = SurrealSignatureRepository<C>;

    fn sessions(&self) -> &Self::Sessions {
        &self.sessions
    }

    fn windows(&self) -> &Self::Windows {
        &self.windows
    }

    fn enrollments(&self) -> &Self::Enrollments {
        &self.enrollments
    }

    fn signatures(&self) -> &Self::Signatures {
        &self.signatures
    }
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn uuid_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}
