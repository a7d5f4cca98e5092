use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from reading the locally held credential.
///
/// Both variants are terminal for the current navigation: retrying a decode
/// cannot change its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("credential expired at {exp}")]
    Expired { exp: i64 },
}

/// Errors from fetching one dashboard data source.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FetchError {
    /// Network failure, timeout, or non-2xx HTTP status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// HTTP 2xx, but the body is not a success envelope.
    #[error("envelope error: {0}")]
    Envelope(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Envelope(_) => "envelope",
        }
    }
}

/// Errors from the persisted client store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("client store I/O error: {0}")]
    Io(String),

    #[error("client store is corrupt: {0}")]
    Corrupt(String),
}

/// Errors from validating a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid route configuration: {0}")]
    InvalidRoute(String),

    #[error("duplicate source id '{0}'")]
    DuplicateSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Transport("HTTP 502".to_string());
        assert_eq!(err.to_string(), "transport failure: HTTP 502");
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_fetch_error_serializes_kind() {
        let json = serde_json::to_value(FetchError::Envelope("status=error".into())).unwrap();
        assert_eq!(json["kind"], "envelope");
        assert_eq!(json["message"], "status=error");
    }

    #[test]
    fn test_credential_error_display() {
        let err = CredentialError::Expired { exp: 42 };
        assert_eq!(err.to_string(), "credential expired at 42");
    }
}
