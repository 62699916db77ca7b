//! Signature ledger: accepts attendance signatures and derives the
//! attendance matrix and roster from them.

use std::collections::HashSet;

use chrono::Utc;
use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::matrix::{AttendanceMatrix, build_matrix};
use emarge_core::models::enrollment::EnrollmentStatus;
use emarge_core::models::signature::{NewSignature, SignatureInsert, SignatureRecord};
use emarge_core::models::window::WindowStatus;
use emarge_core::repository::{
    AttendanceStore, EnrollmentRepository, FeedbackStore, SessionRepository,
    SignatureRepository, WindowRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::AccessError;
use crate::gateway::AccessTokenGateway;

/// A signature submission as it arrives from an attendee's device.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitSignature {
    pub window_token: String,
    pub enrollment_token: String,
    /// Opaque signature image data.
    pub payload: String,
}

/// What a submission resolved to. `created` is false when the slot had
/// already been signed and `record` is the earlier signature.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureReceipt {
    pub record: SignatureRecord,
    pub created: bool,
}

impl From<SignatureInsert> for SignatureReceipt {
    fn from(insert: SignatureInsert) -> Self {
        let created = insert.is_created();
        Self {
            record: insert.into_record(),
            created,
        }
    }
}

pub struct SignatureLedger<R: AttendanceStore> {
    store: R,
    config: ServiceConfig,
}

impl<R: AttendanceStore> SignatureLedger<R> {
    pub fn new(store: R, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Record a signature for the (window, enrollment) the tokens name.
    ///
    /// Only an Open window accepts signatures. The store checks this again
    /// at the write, so a close that lands first wins. Submitting again for
    /// the same slot, sequentially or concurrently, leaves the first record
    /// in place and returns it.
    pub async fn submit(&self, input: SubmitSignature) -> AttendanceResult<SignatureReceipt> {
        self.check_payload(&input.payload)?;

        let gateway = AccessTokenGateway::new(&self.store);
        let ((window, session), (enrollment, _)) = tokio::try_join!(
            gateway.resolve_window(&input.window_token),
            gateway.resolve_enrollment(&input.enrollment_token),
        )?;

        if enrollment.session_id != window.session_id {
            let reason = AccessError::ScopeMismatch {
                enrollment_id: enrollment.id,
                session_id: window.session_id,
            };
            debug!(%reason, "Capability token refused");
            return Err(reason.into());
        }

        // Fast path only; `insert_if_absent` is the authoritative check.
        if window.status != WindowStatus::Open {
            return Err(AttendanceError::WindowClosed);
        }

        let insert = self
            .store
            .signatures()
            .insert_if_absent(NewSignature {
                window_id: window.id,
                enrollment_id: enrollment.id,
                session_id: session.id,
                payload: input.payload,
                signed_at: Utc::now(),
            })
            .await?;

        if insert.is_created() {
            info!(
                window_id = %window.id,
                enrollment_id = %enrollment.id,
                session_id = %session.id,
                "Signature recorded"
            );
        } else {
            debug!(
                window_id = %window.id,
                enrollment_id = %enrollment.id,
                "Slot already signed, keeping first signature"
            );
        }

        Ok(insert.into())
    }

    /// Windows x enrollments grid of a session built from one read of
    /// each collection.
    pub async fn build_matrix(&self, session_id: Uuid) -> AttendanceResult<AttendanceMatrix> {
        self.store.sessions().get_by_id(session_id).await?;
        let (windows, enrollments, keys) = tokio::try_join!(
            self.store.windows().list_by_session(session_id),
            self.store.enrollments().list_by_session(session_id),
            self.store.signatures().list_keys_by_session(session_id),
        )?;
        Ok(build_matrix(windows, enrollments, &keys))
    }

    /// Enrollments with their `has_signed` and `has_feedback` flags.
    pub async fn roster<F: FeedbackStore>(
        &self,
        session_id: Uuid,
        feedback: &F,
    ) -> AttendanceResult<Vec<EnrollmentStatus>> {
        let matrix = self.build_matrix(session_id).await?;
        let ids: Vec<Uuid> = matrix.enrollments.iter().map(|e| e.id).collect();
        let with_feedback: HashSet<Uuid> = feedback.with_feedback(&ids).await?;
        let fully_signed = matrix.fully_signed();

        Ok(matrix
            .enrollments
            .into_iter()
            .zip(fully_signed)
            .map(|(enrollment, has_signed)| EnrollmentStatus {
                has_feedback: with_feedback.contains(&enrollment.id),
                enrollment,
                has_signed,
            })
            .collect())
    }

    fn check_payload(&self, payload: &str) -> AttendanceResult<()> {
        if payload.trim().is_empty() {
            return Err(AttendanceError::validation("signature payload must not be empty"));
        }
        let max = self.config.max_signature_payload_bytes;
        if payload.len() > max {
            return Err(AttendanceError::validation(format!(
                "signature payload exceeds {max} bytes"
            )));
        }
        Ok(())
    }
}
