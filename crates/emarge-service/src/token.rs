//! Opaque capability token generation and hashing.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raw entropy per token.
const TOKEN_BYTES: usize = 32;
/// Length of a base64url (no padding) encoding of [`TOKEN_BYTES`].
const TOKEN_LEN: usize = 43;

/// What a capability token grants access to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Read-only view of a session with its windows and attendees.
    Session,
    /// Signing against one window.
    Window,
    /// Signing as one attendee.
    Enrollment,
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenScope::Session => "session",
            TokenScope::Window => "window",
            TokenScope::Enrollment => "enrollment",
        })
    }
}

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_BYTES] = rng.random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw token, hex-encoded. This is what gets stored.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check done before any storage lookup.
pub fn is_well_formed(raw: &str) -> bool {
    raw.len() == TOKEN_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// A fresh token and the digest to persist for it.
pub(crate) fn issue() -> (String, String) {
    let raw = generate_token();
    let hash = hash_token(&raw);
    (raw, hash)
}
