//! HTTP-backed dashboard sources.

use serde_json::Value;

use sitedesk_core::credential::CredentialSlot;
use sitedesk_core::source::{BoxDataSource, DataSource, SourceDescriptor};
use sitedesk_types::config::{ConsoleConfig, SourceConfig};
use sitedesk_types::error::FetchError;
use sitedesk_types::source::SourceId;

use super::client::ConsoleApiClient;

/// A source fetched with `GET {api_base_url}{path}`.
#[derive(Debug)]
pub struct HttpDataSource<S> {
    id: SourceId,
    path: String,
    client: ConsoleApiClient<S>,
}

impl<S: CredentialSlot> HttpDataSource<S> {
    pub fn new(id: SourceId, path: impl Into<String>, client: ConsoleApiClient<S>) -> Self {
        Self {
            id,
            path: path.into(),
            client,
        }
    }

    pub fn from_config(config: &SourceConfig, client: ConsoleApiClient<S>) -> Self {
        Self::new(config.source_id(), config.path.clone(), client)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<S: CredentialSlot + 'static> DataSource for HttpDataSource<S> {
    fn id(&self) -> &SourceId {
        &self.id
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        tracing::trace!(source = %self.id, path = %self.path, "fetching");
        self.client.get_envelope(&self.path).await
    }
}

/// Descriptors for every configured source, sharing one client.
pub fn http_sources<S: CredentialSlot + 'static>(
    config: &ConsoleConfig,
    client: &ConsoleApiClient<S>,
) -> Vec<SourceDescriptor> {
    config
        .sources
        .iter()
        .map(|source| {
            SourceDescriptor::from_config(source, |c| {
                BoxDataSource::new(HttpDataSource::from_config(c, client.clone()))
            })
        })
        .collect()
}
