//! File-backed client store (`session.json`).

use std::path::{Path, PathBuf};

use sitedesk_core::credential::ClientBackend;
use sitedesk_types::client::ClientSnapshot;
use sitedesk_types::error::StoreError;

/// Persists the client snapshot as JSON. Writes go to a sibling temp file
/// and are renamed into place, so a crash never leaves a half-written store.
#[derive(Debug, Clone)]
pub struct FileClientBackend {
    path: PathBuf,
}

impl FileClientBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend for `{data_dir}/session.json`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(super::session_path(data_dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClientBackend for FileClientBackend {
    async fn load(&self) -> Result<ClientSnapshot, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ClientSnapshot::default());
            }
            Err(err) => {
                return Err(StoreError::Io(format!("{}: {err}", self.path.display())));
            }
        };

        if content.trim().is_empty() {
            return Ok(ClientSnapshot::default());
        }

        serde_json::from_str(&content)
            .map_err(|err| StoreError::Corrupt(format!("{}: {err}", self.path.display())))
    }

    async fn save(&self, snapshot: &ClientSnapshot) -> Result<(), StoreError> {
        let io_err = |err: std::io::Error| StoreError::Io(format!("{}: {err}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|err| StoreError::Io(format!("serialize snapshot: {err}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), "client store saved");
        Ok(())
    }
}
