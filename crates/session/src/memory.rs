//! In-memory session storage.

use async_trait::async_trait;
use pipeline::{CredentialStore, CredentialStoreError, Session};
use tokio::sync::RwLock;

/// Thread-safe in-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Session>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    async fn set_session(&self, session: Session) -> Result<(), CredentialStoreError> {
        *self.session.write().await = session;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialStoreError> {
        *self.session.write().await = Session::default();
        Ok(())
    }
}
