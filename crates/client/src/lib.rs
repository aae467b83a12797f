//! Per-service request clients.
//!
//! This crate turns the pure stages of the [`pipeline`] crate into the facade
//! every page uses: a [`ServiceRegistry`] of [`ServiceClient`]s, each exposing
//! `get`/`post`/`put`/`delete`.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Clients sequence calls between the pure pipeline
//! stages and the injected ports (transport, credential store, notifier,
//! navigator). They own the two pieces of behaviour that touch shared state:
//! credential injection and side-effect dispatch.
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo(registry: client::ServiceRegistry) -> Result<(), pipeline::ClassifiedError> {
//! use pipeline::{Payload, RequestOptions};
//! use serde_json::Value;
//!
//! let content = registry.client("content");
//! let query = Payload::object().with("keyword", "rust").with("owner", "");
//! let articles: Value = content
//!     .get("/articles", RequestOptions::default().with_query(query))
//!     .await?;
//! # let _ = articles;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod registry;
pub mod service;
pub mod testing;

pub use config::{ClientConfig, ConfigError, CLIENT_VERSION_HEADER, DEVICE_TYPE_HEADER};
pub use credentials::{credential_headers, AUTHORIZATION_HEADER, USER_ID_HEADER};
pub use dispatch::{login_redirect_target, SideEffectDispatcher};
pub use registry::{Collaborators, RegistryBuilder, RegistryError, ServiceRegistry};
pub use service::{ServiceClient, ServiceEndpoint};
