//! Process-wide client store for the session credential and theme preference.
//!
//! The store must be opened (loaded from its backend) before anything reads
//! it; [`ClientStore::open`] is the only constructor. Every consumer reads
//! through the accessors on each use instead of keeping a copy, so a clear is
//! visible to the very next gate evaluation.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};

use sitedesk_types::client::{ClientSnapshot, Theme};
use sitedesk_types::error::StoreError;

/// Persistence backend for the client store (file, browser storage, memory).
///
/// Uses native async fn in traits (no async_trait macro).
pub trait ClientBackend: Send + Sync {
    /// Load the persisted snapshot. A missing store is an empty snapshot,
    /// not an error.
    fn load(&self) -> impl Future<Output = Result<ClientSnapshot, StoreError>> + Send;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &ClientSnapshot) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Read/clear access to a credential, as seen by the session gate.
///
/// Implemented by the process-wide [`ClientStore`] and by per-request cookie
/// slots on the server side.
pub trait CredentialSlot: Send + Sync {
    /// Current credential, read at call time.
    fn credential(&self) -> Option<SecretString>;

    /// Remove the credential. Once this resolves, [`credential`](Self::credential)
    /// returns `None`.
    fn clear_credential(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Default)]
struct ClientState {
    token: Option<SecretString>,
    theme: Theme,
}

/// The client-held store. Share it behind an `Arc`.
pub struct ClientStore<B> {
    backend: B,
    state: RwLock<ClientState>,
    /// Serializes saves so the backend sees writes in the order memory did.
    save_lock: tokio::sync::Mutex<()>,
}

impl<B: ClientBackend> ClientStore<B> {
    /// Initialize the store from its backend.
    ///
    /// A corrupt snapshot is discarded (logged) and the store starts empty;
    /// an I/O failure is returned.
    pub async fn open(backend: B) -> Result<Self, StoreError> {
        let snapshot = match backend.load().await {
            Ok(snapshot) => snapshot,
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(%reason, "client store is corrupt, starting empty");
                ClientSnapshot::default()
            }
            Err(err) => return Err(err),
        };

        let state = ClientState {
            token: snapshot.token.map(SecretString::from),
            theme: snapshot.theme,
        };

        Ok(Self {
            backend,
            state: RwLock::new(state),
            save_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn credential(&self) -> Option<SecretString> {
        self.read(|s| s.token.clone())
    }

    pub fn has_credential(&self) -> bool {
        self.read(|s| s.token.is_some())
    }

    /// Store a new credential and persist it.
    pub async fn set_credential(&self, token: SecretString) -> Result<(), StoreError> {
        self.write(|s| s.token = Some(token));
        self.persist().await
    }

    /// Drop the credential. Memory is cleared before the backend is touched,
    /// so a failed save cannot bring the credential back for this process.
    pub async fn clear_credential(&self) {
        self.write(|s| s.token = None);
        if let Err(err) = self.persist().await {
            tracing::warn!(error = %err, "failed to persist cleared credential");
        }
    }

    pub fn theme(&self) -> Theme {
        self.read(|s| s.theme)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.write(|s| s.theme = theme);
        self.persist().await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().await;
        // Snapshot under the save lock so the last save always carries the
        // latest in-memory state.
        let snapshot = self.read(|s| ClientSnapshot {
            token: s.token.as_ref().map(|t| t.expose_secret().to_string()),
            theme: s.theme,
        });
        self.backend.save(&snapshot).await
    }

    fn read<T>(&self, f: impl FnOnce(&ClientState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut ClientState)) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

impl<B: ClientBackend> CredentialSlot for ClientStore<B> {
    fn credential(&self) -> Option<SecretString> {
        ClientStore::credential(self)
    }

    async fn clear_credential(&self) {
        ClientStore::clear_credential(self).await
    }
}

impl<T: CredentialSlot + ?Sized> CredentialSlot for Arc<T> {
    fn credential(&self) -> Option<SecretString> {
        (**self).credential()
    }

    fn clear_credential(&self) -> impl Future<Output = ()> + Send {
        (**self).clear_credential()
    }
}

/// In-memory backend. Clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    snapshot: Arc<Mutex<ClientSnapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-loaded with a snapshot.
    pub fn with_snapshot(snapshot: ClientSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// What a fresh `open` would read.
    pub fn persisted(&self) -> ClientSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ClientBackend for MemoryBackend {
    async fn load(&self) -> Result<ClientSnapshot, StoreError> {
        Ok(self.persisted())
    }

    async fn save(&self, snapshot: &ClientSnapshot) -> Result<(), StoreError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }
}
