//! Logout transport over the console API.

use sitedesk_core::credential::CredentialSlot;
use sitedesk_core::logout::LogoutTransport;
use sitedesk_types::error::FetchError;

use super::client::ConsoleApiClient;

/// Sends `POST {logout_path}` with the current credential attached.
#[derive(Debug)]
pub struct HttpLogout<S> {
    client: ConsoleApiClient<S>,
    path: String,
}

impl<S: CredentialSlot> HttpLogout<S> {
    pub fn new(client: ConsoleApiClient<S>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

impl<S: CredentialSlot> LogoutTransport for HttpLogout<S> {
    async fn logout(&self) -> Result<(), FetchError> {
        self.client.post(&self.path).await
    }
}
