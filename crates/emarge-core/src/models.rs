//! Domain models for training sessions and attendance signatures.

pub mod enrollment;
pub mod history;
pub mod reminder;
pub mod session;
pub mod signature;
pub mod window;

/// A freshly created entity together with its raw capability token.
///
/// Only the SHA-256 digest of the token is persisted, so this is the one
/// and only time the raw value is available.
#[derive(Debug, Clone)]
pub struct Issued<T> {
    pub entity: T,
    pub token: String,
}
