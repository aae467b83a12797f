//! Port traits for the external collaborators of the request pipeline.
//!
//! The pipeline never touches the network, persistent storage, or the UI
//! directly. Infrastructure crates implement these traits and the composition
//! root injects them.
//!
//! | Port | Implemented by |
//! |------|----------------|
//! | [`Transport`] | `transport::ReqwestTransport` |
//! | [`CredentialStore`] | `session::MemoryCredentialStore`, `session::FileCredentialStore` |
//! | [`Notifier`] | the UI layer (terminal adapter in `cli`) |
//! | [`Navigator`] | the routing layer (terminal adapter in `cli`) |

use async_trait::async_trait;
use thiserror::Error;

use crate::{OutgoingRequest, Session, TransportFailure, TransportResponse};

/// Performs the network call for a prepared request.
///
/// A response with any status, including 4xx and 5xx, is `Ok`: interpreting
/// statuses is the pipeline's job. `Err` means no usable response arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the raw response.
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportFailure>;
}

/// Error raised by a [`CredentialStore`] backend.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The backing storage could not be read or written.
    #[error("credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored session could not be encoded or decoded.
    #[error("credential storage is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The persistent holder of the current session.
///
/// Read on every outgoing request; cleared when the session is invalidated.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the current session (possibly empty).
    async fn session(&self) -> Session;

    /// Replaces the current session.
    async fn set_session(&self, session: Session) -> Result<(), CredentialStoreError>;

    /// Removes the token and user id.
    async fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// The user-visible notification primitive.
pub trait Notifier: Send + Sync {
    /// Shows `message` to the user.
    fn notify(&self, message: &str);
}

/// The navigation system.
pub trait Navigator: Send + Sync {
    /// Returns the current location (path plus query), e.g. `"/docs?id=3"`.
    fn current_location(&self) -> String;

    /// Performs a full-page redirect to `target`.
    fn redirect(&self, target: &str);
}
