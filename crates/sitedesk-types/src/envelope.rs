//! Response envelope returned by every console API collection endpoint.
//!
//! ```json
//! { "status": "success", "data": { ... } }
//! { "status": "error", "message": "..." }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
    /// Any status string the console does not know about.
    #[serde(other)]
    Unknown,
}

/// `{ status, data }` wrapper around an API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    /// Unwrap the payload. Anything other than `status == "success"` with a
    /// present `data` field is an envelope error.
    pub fn into_data(self) -> Result<T, FetchError> {
        match (self.status, self.data) {
            (EnvelopeStatus::Success, Some(data)) => Ok(data),
            (EnvelopeStatus::Success, None) => {
                Err(FetchError::Envelope("success envelope without data".to_string()))
            }
            (status, _) => Err(FetchError::Envelope(
                self.message
                    .unwrap_or_else(|| format!("status {status:?}").to_lowercase()),
            )),
        }
    }
}
