//! Client configuration.
//!
//! One base address per logical service per environment, one shared timeout,
//! and the static identification headers. The configuration is read once at
//! start-up (the `cli` crate parses it from TOML) and never changes at runtime.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{Collaborators, RegistryBuilder, ServiceRegistry, DEFAULT_LOGIN_PATH};

/// Header identifying the client build.
pub const CLIENT_VERSION_HEADER: &str = "X-Client-Version";
/// Header identifying the kind of device.
pub const DEVICE_TYPE_HEADER: &str = "X-Device-Type";

/// Errors in the client configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested environment is not declared.
    #[error("environment '{requested}' is not configured (available: {available})")]
    UnknownEnvironment {
        /// The environment that was asked for.
        requested: String,
        /// Comma-separated list of declared environments.
        available: String,
    },

    /// The environment declares no services.
    #[error("environment '{0}' declares no services")]
    NoServices(String),

    /// `timeout_ms` is zero.
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    /// `login_path` is not an absolute path.
    #[error("login_path must start with '/', got '{0}'")]
    InvalidLoginPath(String),
}

/// The full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Timeout shared by every call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Value of the `X-Client-Version` header.
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Value of the `X-Device-Type` header.
    #[serde(default = "default_device_type")]
    pub device_type: String,

    /// Path of the login view.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// File backing the credential store. `None` keeps the session in memory.
    #[serde(default)]
    pub credential_file: Option<PathBuf>,

    /// Environment name → (service name → base address).
    #[serde(default)]
    pub environments: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_device_type() -> String {
    "web".to_owned()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_owned()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            client_version: default_client_version(),
            device_type: default_device_type(),
            login_path: default_login_path(),
            credential_file: None,
            environments: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// The shared timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the service table of `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] or
    /// [`ConfigError::NoServices`].
    pub fn services_for(&self, environment: &str) -> Result<&BTreeMap<String, String>, ConfigError> {
        let services =
            self.environments
                .get(environment)
                .ok_or_else(|| ConfigError::UnknownEnvironment {
                    requested: environment.to_owned(),
                    available: self
                        .environments
                        .keys()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                })?;
        if services.is_empty() {
            return Err(ConfigError::NoServices(environment.to_owned()));
        }
        Ok(services)
    }

    /// Checks the settings that do not depend on the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] or [`ConfigError::InvalidLoginPath`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::InvalidLoginPath(self.login_path.clone()));
        }
        Ok(())
    }

    /// Prepares a registry builder for `environment`: its services, the shared
    /// timeout, the login path, and the static identification headers.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if validation fails or the environment is
    /// unknown or empty.
    pub fn registry_builder(
        &self,
        environment: &str,
        collaborators: Collaborators,
    ) -> Result<RegistryBuilder, ConfigError> {
        self.validate()?;
        let services = self.services_for(environment)?;

        let builder = ServiceRegistry::builder(collaborators)
            .timeout(self.timeout())
            .login_path(self.login_path.clone())
            .default_header(CLIENT_VERSION_HEADER, self.client_version.clone())
            .default_header(DEVICE_TYPE_HEADER, self.device_type.clone());

        Ok(services
            .iter()
            .fold(builder, |b, (name, address)| b.service(name, address)))
    }
}
