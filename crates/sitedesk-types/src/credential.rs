//! Bearer credential payload and the four credential states.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Claims read from the payload segment of a bearer credential.
///
/// Only `exp` drives any decision. The signature is never checked here;
/// the backend verifies it on every state-changing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPayload {
    /// Expiry as Unix time in seconds.
    pub exp: i64,
    /// Opaque subject identifier. Carried through, never interpreted.
    #[serde(default)]
    pub id: serde_json::Value,
}

impl CredentialPayload {
    /// Whether the credential is still live at `now` (Unix seconds).
    pub fn is_live_at(&self, now: i64) -> bool {
        self.exp > now
    }
}

/// Classification of the locally held credential at a point in time.
///
/// The four variants are mutually exclusive and exhaustive.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialState {
    /// No credential is stored.
    Absent,
    /// Wrong segment count, empty segment, or undecodable payload.
    Malformed,
    /// Structurally valid but `exp <= now`.
    Expired(CredentialPayload),
    /// Structurally valid and `exp > now`.
    Live(CredentialPayload),
}

impl CredentialState {
    /// States that must be wiped from the client store when seen by the gate.
    pub fn requires_clear(&self) -> bool {
        matches!(self, CredentialState::Malformed | CredentialState::Expired(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CredentialState::Absent => "absent",
            CredentialState::Malformed => "malformed",
            CredentialState::Expired(_) => "expired",
            CredentialState::Live(_) => "live",
        }
    }
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
