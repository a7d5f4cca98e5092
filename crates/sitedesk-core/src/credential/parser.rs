//! Structural decode of a bearer credential.
//!
//! A credential is `header.payload.signature`, each segment base64url. Only the
//! payload is read, and only so the client can skip an obviously dead session
//! without a server round trip. The signature is never checked.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use sitedesk_types::credential::{CredentialPayload, CredentialState};
use sitedesk_types::error::CredentialError;

/// Decode the payload segment of `raw`.
///
/// Fails with [`CredentialError::Malformed`] unless `raw` has exactly three
/// non-empty dot-separated segments and the middle one is base64url-encoded
/// JSON carrying an integer `exp`. Padding (`=`) on the segment is tolerated.
pub fn decode(raw: &str) -> Result<CredentialPayload, CredentialError> {
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(CredentialError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CredentialError::Malformed("empty segment".to_string()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| CredentialError::Malformed(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice::<CredentialPayload>(&bytes)
        .map_err(|e| CredentialError::Malformed(format!("payload is not a claims object: {e}")))
}

/// Decode `raw` and check it against `now` (Unix seconds).
pub fn decode_live(raw: &str, now: i64) -> Result<CredentialPayload, CredentialError> {
    let payload = decode(raw)?;
    if payload.is_live_at(now) {
        Ok(payload)
    } else {
        Err(CredentialError::Expired { exp: payload.exp })
    }
}

/// Classify an optional raw credential at `now`. Never fails: decode errors
/// fold into [`CredentialState::Malformed`].
pub fn classify(raw: Option<&str>, now: i64) -> CredentialState {
    let Some(raw) = raw else {
        return CredentialState::Absent;
    };

    match decode(raw) {
        Ok(payload) if payload.is_live_at(now) => CredentialState::Live(payload),
        Ok(payload) => CredentialState::Expired(payload),
        Err(err) => {
            tracing::debug!(error = %err, "stored credential failed to decode");
            CredentialState::Malformed
        }
    }
}

/// Build an unsigned credential with the given claims. Used by tests and by
/// tooling that needs a structurally valid token.
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.unsigned")
}
