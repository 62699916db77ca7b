//! Signature ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composite key of a signature: one per (window, enrollment).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    pub window_id: Uuid,
    pub enrollment_id: Uuid,
}

/// An attendance confirmation. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub window_id: Uuid,
    pub enrollment_id: Uuid,
    pub session_id: Uuid,
    pub payload: String,
    pub signed_at: DateTime<Utc>,
}

impl SignatureRecord {
    pub fn key(&self) -> SignatureKey {
        SignatureKey {
            window_id: self.window_id,
            enrollment_id: self.enrollment_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSignature {
    pub window_id: Uuid,
    pub enrollment_id: Uuid,
    pub session_id: Uuid,
    pub payload: String,
    pub signed_at: DateTime<Utc>,
}

/// Outcome of an insert-if-absent write.
#[derive(Debug, Clone)]
pub enum SignatureInsert {
    /// This write stored the record.
    Created(SignatureRecord),
    /// A record already existed for the key; it is returned unchanged.
    Existing(SignatureRecord),
}

impl SignatureInsert {
    pub fn record(&self) -> &SignatureRecord {
        match self {
            SignatureInsert::Created(r) | SignatureInsert::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> SignatureRecord {
        match self {
            SignatureInsert::Created(r) | SignatureInsert::Existing(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SignatureInsert::Created(_))
    }
}
