//! Service configuration.

use emarge_core::models::reminder::ReminderPolicy;
use serde::Deserialize;

/// Configuration shared by the attendance services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Attempts at a session transition before a `Conflict` is surfaced
    /// (default: 3). Values below 1 are treated as 1.
    pub max_transition_attempts: u32,
    /// Largest accepted signature payload in bytes (default: 512 KiB).
    pub max_signature_payload_bytes: usize,
    /// Feedback reminder cut-off and offset.
    pub reminder: ReminderPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_transition_attempts: 3,
            max_signature_payload_bytes: 512 * 1024,
            reminder: ReminderPolicy::default(),
        }
    }
}
