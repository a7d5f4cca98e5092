//! Application state wiring the console together.
//!
//! AppState holds the concrete instances used by both CLI commands and the
//! console server. Core components are generic over their ports; AppState
//! pins them to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use sitedesk_core::clock::SystemClock;
use sitedesk_core::credential::ClientStore;
use sitedesk_core::gate::{RouteTable, SessionGate};
use sitedesk_core::source::SourceDescriptor;
use sitedesk_infra::config::load_console_config;
use sitedesk_infra::filesystem::{resolve_data_dir, FileClientBackend};
use sitedesk_infra::http::{http_sources, ConsoleApiClient, HttpLogout};
use sitedesk_types::config::ConsoleConfig;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteStore = ClientStore<FileClientBackend>;
pub type ConcreteGate = SessionGate<SystemClock>;
pub type ConcreteApiClient = ConsoleApiClient<ConcreteStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConsoleConfig>,
    pub store: Arc<ConcreteStore>,
    pub gate: Arc<ConcreteGate>,
    pub api: ConcreteApiClient,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data dir, load config, and open the client store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_console_config(&data_dir).await;
        let store = ClientStore::open(FileClientBackend::in_data_dir(&data_dir)).await?;

        Self::from_parts(config, store, data_dir)
    }

    /// Wire state from already-loaded parts.
    pub fn from_parts(
        config: ConsoleConfig,
        store: ConcreteStore,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(store);
        let gate = SessionGate::new(RouteTable::from_config(&config), SystemClock);
        let api = ConsoleApiClient::new(&config, store.clone())?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            api = %config.api_base_url,
            sources = config.sources.len(),
            "application state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            gate: Arc::new(gate),
            api,
            data_dir,
        })
    }

    pub fn sources(&self) -> Vec<SourceDescriptor> {
        http_sources(&self.config, &self.api)
    }

    pub fn logout_transport(&self) -> HttpLogout<ConcreteStore> {
        HttpLogout::new(self.api.clone(), self.config.logout_path.clone())
    }
}
