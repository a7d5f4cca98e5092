//! Dashboard data-source port.
//!
//! A data source is one independently fetchable metric or record set (visitor
//! stats, active visitors, inbound messages). The infrastructure layer
//! implements [`DataSource`] over HTTP; the aggregator and poller only see the
//! type-erased [`BoxDataSource`].

mod boxed;
#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sitedesk_types::config::SourceConfig;
use sitedesk_types::error::FetchError;
use sitedesk_types::source::{Criticality, Refresh, SourceId};

pub use boxed::{BoxDataSource, DataSourceDyn};

/// A fetchable dashboard source. Values are JSON so that heterogeneous
/// sources share one view; read them back typed with `ViewState::get_as`.
///
/// Uses native async fn in traits (no async_trait macro).
pub trait DataSource: Send + Sync + 'static {
    fn id(&self) -> &SourceId;

    /// Fetch the current value. A non-success response envelope is a
    /// [`FetchError::Envelope`]; everything below it is a
    /// [`FetchError::Transport`].
    fn fetch(&self) -> impl Future<Output = Result<serde_json::Value, FetchError>> + Send;
}

/// A source together with its cadence and criticality.
#[derive(Clone)]
pub struct SourceDescriptor {
    pub source: Arc<BoxDataSource>,
    pub refresh: Refresh,
    pub criticality: Criticality,
}

impl SourceDescriptor {
    pub fn new(source: BoxDataSource, refresh: Refresh, criticality: Criticality) -> Self {
        Self {
            source: Arc::new(source),
            refresh,
            criticality,
        }
    }

    /// Descriptor for a configured source. `make` builds the fetcher.
    pub fn from_config(config: &SourceConfig, make: impl FnOnce(&SourceConfig) -> BoxDataSource) -> Self {
        Self::new(make(config), config.refresh(), config.criticality())
    }

    pub fn id(&self) -> &SourceId {
        self.source.id()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.refresh.interval()
    }
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("id", self.id())
            .field("refresh", &self.refresh)
            .field("criticality", &self.criticality)
            .finish()
    }
}

/// Run one fetch bounded by `timeout`. A timeout is a transport failure.
pub async fn fetch_with_timeout(
    source: &BoxDataSource,
    timeout: Duration,
) -> Result<serde_json::Value, FetchError> {
    match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Transport(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}
