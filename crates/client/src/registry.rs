//! Service Registry.
//!
//! Maps each logical service name to one [`ServiceClient`] bound to that
//! service's base address, the shared timeout, and the default headers.
//! [`RegistryBuilder::build`] is the only mutation point: once built, the set
//! of services never changes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pipeline::{CredentialStore, CredentialStoreError, Navigator, Notifier, ServiceName, Session, Transport};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::dispatch::SideEffectDispatcher;
use crate::service::{ServiceClient, ServiceEndpoint, Shared};

/// Default timeout shared by every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default path of the login view.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building a [`ServiceRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A service was registered with an empty name.
    #[error("service name must not be empty")]
    EmptyServiceName,

    /// Two services were registered under the same name.
    #[error("service '{0}' is registered more than once")]
    DuplicateService(String),

    /// A base address is not an absolute `http`/`https` URL.
    #[error("service '{name}' has an invalid base address '{address}': {reason}")]
    InvalidBaseAddress {
        /// Service name.
        name: String,
        /// The rejected address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The shared timeout is zero.
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external collaborators a registry is wired with.
///
/// Constructed once by the composition root and injected; the registry holds
/// no ambient globals.
#[derive(Clone)]
pub struct Collaborators {
    /// Performs the network calls.
    pub transport: Arc<dyn Transport>,
    /// Holds the session.
    pub credentials: Arc<dyn CredentialStore>,
    /// Shows failure messages to the user.
    pub notifier: Arc<dyn Notifier>,
    /// Performs the login redirect.
    pub navigator: Arc<dyn Navigator>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects endpoints and shared settings for a [`ServiceRegistry`].
pub struct RegistryBuilder {
    collaborators: Collaborators,
    endpoints: Vec<(String, String)>,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
    login_path: String,
}

impl RegistryBuilder {
    /// Registers `name` at `base_address`. Validation happens in [`Self::build`].
    #[must_use]
    pub fn service(mut self, name: impl Into<String>, base_address: impl Into<String>) -> Self {
        self.endpoints.push((name.into(), base_address.into()));
        self
    }

    /// Sets the timeout shared by every call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a static header sent with every call (e.g. `X-Client-Version`).
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the path of the login view used for session-expiry redirects.
    #[must_use]
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Validates every endpoint and freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for an empty or duplicate name, a base
    /// address that is not an absolute `http(s)` URL, or a zero timeout.
    pub fn build(self) -> Result<ServiceRegistry, RegistryError> {
        if self.timeout.is_zero() {
            return Err(RegistryError::ZeroTimeout);
        }

        let Collaborators {
            transport,
            credentials,
            notifier,
            navigator,
        } = self.collaborators;

        let dispatcher =
            SideEffectDispatcher::new(credentials.clone(), notifier, navigator, self.login_path);
        let shared = Arc::new(Shared {
            transport,
            credentials,
            dispatcher,
            timeout: self.timeout,
            default_headers: self.default_headers,
        });

        let mut clients = BTreeMap::new();
        for (name, address) in self.endpoints {
            let service_name = ServiceName::new(name.clone()).ok_or(RegistryError::EmptyServiceName)?;
            let base_address = parse_base_address(&name, &address)?;
            if clients.contains_key(&name) {
                return Err(RegistryError::DuplicateService(name));
            }
            debug!(service = %name, base_address = %base_address, "registering service");
            let endpoint = ServiceEndpoint::new(service_name, base_address);
            clients.insert(name, ServiceClient::new(endpoint, shared.clone()));
        }

        info!(
            services = clients.len(),
            timeout_ms = u64::try_from(shared.timeout.as_millis()).unwrap_or(u64::MAX),
            "service registry ready"
        );
        Ok(ServiceRegistry { clients, shared })
    }
}

fn parse_base_address(name: &str, address: &str) -> Result<Url, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidBaseAddress {
        name: name.to_owned(),
        address: address.to_owned(),
        reason,
    };
    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The frozen set of service clients.
pub struct ServiceRegistry {
    clients: BTreeMap<String, ServiceClient>,
    shared: Arc<Shared>,
}

impl ServiceRegistry {
    /// Starts a registry wired with `collaborators`.
    pub fn builder(collaborators: Collaborators) -> RegistryBuilder {
        RegistryBuilder {
            collaborators,
            endpoints: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            default_headers: Vec::new(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
        }
    }

    /// Returns the client for `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` was never registered. Asking for an unknown service is
    /// a programming error, not a runtime condition; use [`Self::get`] to look a name up fallibly.
    pub fn client(&self, name: &str) -> &ServiceClient {
        self.get(name)
            .unwrap_or_else(|| panic!("service '{name}' is not registered"))
    }

    /// Returns the client for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<&ServiceClient> {
        self.clients.get(name)
    }

    /// Iterates over the registered endpoints in name order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        self.clients.values().map(ServiceClient::endpoint)
    }

    /// Stores a freshly authenticated session and re-arms the login redirect.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the session could not be persisted; the
    /// redirect guard is left untouched in that case.
    pub async fn sign_in(&self, session: Session) -> Result<(), CredentialStoreError> {
        self.shared.credentials.set_session(session).await?;
        self.shared.dispatcher.rearm();
        info!("session established");
        Ok(())
    }

    /// Clears the session.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the session could not be cleared.
    pub async fn sign_out(&self) -> Result<(), CredentialStoreError> {
        self.shared.credentials.clear().await?;
        info!("session cleared");
        Ok(())
    }

    /// Returns `true` while a login redirect triggered by an expired session
    /// is pending.
    pub fn is_redirecting(&self) -> bool {
        self.shared.dispatcher.is_redirecting()
    }
}

#[cfg(test)]
mod tests {
    use session::MemoryCredentialStore;

    use super::*;
    use crate::testing::{RecordingNavigator, RecordingNotifier, ScriptedTransport};

    fn collaborators() -> Collaborators {
        Collaborators {
            transport: Arc::new(ScriptedTransport::new()),
            credentials: Arc::new(MemoryCredentialStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            navigator: Arc::new(RecordingNavigator::new("/")),
        }
    }

    #[test]
    fn registers_and_looks_up_services() {
        let registry = ServiceRegistry::builder(collaborators())
            .service("content", "http://localhost:8080/api")
            .service("auth", "https://auth.example.com")
            .build()
            .unwrap();

        assert_eq!(
            registry.client("content").endpoint().base_address().as_str(),
            "http://localhost:8080/api"
        );
        assert!(registry.get("identity").is_none());
        let names: Vec<_> = registry.services().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["auth", "content"]);
    }

    #[test]
    #[should_panic(expected = "service 'identity' is not registered")]
    fn unknown_service_fails_fast() {
        let registry = ServiceRegistry::builder(collaborators())
            .service("content", "http://localhost:8080")
            .build()
            .unwrap();
        let _ = registry.client("identity");
    }

    #[test]
    fn rejects_duplicates() {
        let result = ServiceRegistry::builder(collaborators())
            .service("content", "http://a")
            .service("content", "http://b")
            .build();
        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateService("content".to_owned()))
        );
    }

    #[test]
    fn rejects_bad_addresses_and_names() {
        let err = ServiceRegistry::builder(collaborators())
            .service("content", "ftp://files")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::InvalidBaseAddress { .. }));

        let err = ServiceRegistry::builder(collaborators())
            .service("content", "not a url")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::InvalidBaseAddress { .. }));

        let err = ServiceRegistry::builder(collaborators())
            .service("", "http://a")
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::EmptyServiceName);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ServiceRegistry::builder(collaborators())
            .timeout(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::ZeroTimeout);
    }
}
