//! ConsoleApiClient -- reqwest client for the console API.
//!
//! The credential is read from the client store accessor on every request and
//! attached as a cookie. It is never captured at construction time, so a
//! logout is visible to the next request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::COOKIE;
use secrecy::ExposeSecret;
use serde_json::Value;

use sitedesk_core::credential::CredentialSlot;
use sitedesk_types::config::ConsoleConfig;
use sitedesk_types::envelope::Envelope;
use sitedesk_types::error::FetchError;

/// Shared console API client. Cheap to clone.
pub struct ConsoleApiClient<S> {
    client: reqwest::Client,
    base_url: String,
    cookie_name: String,
    slot: Arc<S>,
}

impl<S> Clone for ConsoleApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            cookie_name: self.cookie_name.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<S: CredentialSlot> ConsoleApiClient<S> {
    pub fn new(config: &ConsoleConfig, slot: Arc<S>) -> Result<Self, FetchError> {
        Self::with_timeout(config, slot, config.request_timeout())
    }

    /// Build with an explicit transport timeout.
    pub fn with_timeout(
        config: &ConsoleConfig,
        slot: Arc<S>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cookie_name: config.cookie_name.clone(),
            slot,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// `GET path` and unwrap the response envelope.
    pub async fn get_envelope(&self, path: &str) -> Result<Value, FetchError> {
        let request = self.with_credential(self.client.get(self.url(path)));
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("GET {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Transport(format!("HTTP {status}: {}", truncate(&body))));
        }

        let envelope: Envelope<Value> = response
            .json()
            .await
            .map_err(|e| FetchError::Envelope(format!("failed to parse response: {e}")))?;
        envelope.into_data()
    }

    /// `POST path` with no body. Any 2xx is success.
    pub async fn post(&self, path: &str) -> Result<(), FetchError> {
        let request = self.with_credential(self.client.post(self.url(path)));
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("POST {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }
        Ok(())
    }

    fn with_credential(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.slot.credential() {
            Some(token) => request.header(
                COOKIE,
                format!("{}={}", self.cookie_name, token.expose_secret()),
            ),
            None => request,
        }
    }
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl<S> std::fmt::Debug for ConsoleApiClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleApiClient")
            .field("base_url", &self.base_url)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}
