//! Capability-token gateway.
//!
//! The only place raw tokens are turned into entities. A token is valid
//! when its digest matches a stored entity and the session it belongs to
//! is not cancelled; nothing is ever revoked or flagged on the token
//! itself. Whatever the reason for a refusal, callers see
//! [`AttendanceError::TokenInvalid`]; the reason is logged at debug level.

use emarge_core::error::{AttendanceError, AttendanceResult};
use emarge_core::models::enrollment::Enrollment;
use emarge_core::models::session::{Session, SessionStatus};
use emarge_core::models::window::SignatureWindow;
use emarge_core::repository::{
    AttendanceStore, EnrollmentRepository, SessionRepository, WindowRepository,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AccessError;
use crate::token::{self, TokenScope};

/// Log the refusal reason and return the public error.
fn deny(scope: TokenScope, reason: AccessError) -> AttendanceError {
    debug!(%scope, %reason, "Capability token refused");
    reason.into()
}

/// Any failed lookup behind a token is just another refusal. Storage
/// failures are logged where operators will see them.
fn unknown(scope: TokenScope, err: AttendanceError) -> AttendanceError {
    match err {
        AttendanceError::NotFound { .. } => deny(scope, AccessError::Unknown(scope)),
        other => {
            warn!(%scope, error = %other, "Capability token lookup failed");
            deny(scope, AccessError::Lookup(scope))
        }
    }
}

fn ensure_live(scope: TokenScope, session: &Session) -> AttendanceResult<()> {
    if session.status == SessionStatus::Cancelled {
        return Err(deny(
            scope,
            AccessError::ParentCancelled {
                session_id: session.id,
            },
        ));
    }
    Ok(())
}

pub struct AccessTokenGateway<'a, R: AttendanceStore> {
    store: &'a R,
}

impl<'a, R: AttendanceStore> AccessTokenGateway<'a, R> {
    pub fn new(store: &'a R) -> Self {
        Self { store }
    }

    /// Resolve `raw` in `scope` to the id of the entity it grants access to.
    pub async fn validate(&self, scope: TokenScope, raw: &str) -> AttendanceResult<Uuid> {
        match scope {
            TokenScope::Session => self.resolve_session(raw).await.map(|s| s.id),
            TokenScope::Window => self.resolve_window(raw).await.map(|(w, _)| w.id),
            TokenScope::Enrollment => self.resolve_enrollment(raw).await.map(|(e, _)| e.id),
        }
    }

    pub async fn resolve_session(&self, raw: &str) -> AttendanceResult<Session> {
        let scope = TokenScope::Session;
        let hash = digest(scope, raw)?;
        let session = self
            .store
            .sessions()
            .get_by_token_hash(&hash)
            .await
            .map_err(|e| unknown(scope, e))?;
        ensure_live(scope, &session)?;
        Ok(session)
    }

    /// The window as currently stored, with its session. A closed window
    /// still resolves; refusing to sign is the ledger's decision.
    pub async fn resolve_window(&self, raw: &str) -> AttendanceResult<(SignatureWindow, Session)> {
        let scope = TokenScope::Window;
        let hash = digest(scope, raw)?;
        let window = self
            .store
            .windows()
            .get_by_token_hash(&hash)
            .await
            .map_err(|e| unknown(scope, e))?;
        let session = self.parent(scope, window.session_id).await?;
        Ok((window, session))
    }

    pub async fn resolve_enrollment(&self, raw: &str) -> AttendanceResult<(Enrollment, Session)> {
        let scope = TokenScope::Enrollment;
        let hash = digest(scope, raw)?;
        let enrollment = self
            .store
            .enrollments()
            .get_by_token_hash(&hash)
            .await
            .map_err(|e| unknown(scope, e))?;
        let session = self.parent(scope, enrollment.session_id).await?;
        Ok((enrollment, session))
    }

    async fn parent(&self, scope: TokenScope, session_id: Uuid) -> AttendanceResult<Session> {
        let session = self
            .store
            .sessions()
            .get_by_id(session_id)
            .await
            .map_err(|e| unknown(scope, e))?;
        ensure_live(scope, &session)?;
        Ok(session)
    }
}

fn digest(scope: TokenScope, raw: &str) -> AttendanceResult<String> {
    if !token::is_well_formed(raw) {
        return Err(deny(scope, AccessError::Malformed));
    }
    Ok(token::hash_token(raw))
}
