//! HTTP transport adapter.
//!
//! Implements the [`pipeline::Transport`] trait over `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS, body encoding (JSON or
//! multipart), and the mapping of `reqwest` errors onto transport signals all
//! live here. The [`pipeline`] crate sees only [`pipeline::Transport`].
//!
//! ## Failure mapping
//!
//! | `reqwest` error | [`pipeline::TransportSignal`] |
//! |-----------------|-------------------------------|
//! | `is_timeout()` | `Timeout` |
//! | `is_connect()` | `Network` |
//! | anything else | none (classified by message) |
//!
//! Every received response, whatever its status, is returned as `Ok`.

mod config;
mod reqwest_transport;

pub use config::TransportConfig;
pub use reqwest_transport::{ReqwestTransport, TransportBuildError};
