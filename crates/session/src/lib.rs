//! Credential store adapters.
//!
//! Implements the [`pipeline::CredentialStore`] trait with two backends:
//!
//! - [`MemoryCredentialStore`] keeps the session in process memory. It suits
//!   tests and short-lived tools.
//! - [`FileCredentialStore`] persists the session as JSON on disk, so a token
//!   obtained by one `kbctl login` survives until `kbctl logout` or a 401.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Storage format and file handling live here. The
//! [`pipeline`] crate sees only [`pipeline::CredentialStore`].

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;
