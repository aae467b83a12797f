//! Request pipeline domain.
//!
//! This crate contains every concept the unified request layer is built from:
//! the outgoing value model, the pure pipeline stages, the classified error
//! taxonomy, and the port traits that infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a request goes through; infrastructure crates define
//! *how* bytes reach the network, where the session is stored, and how the
//! user is told about failures.
//!
//! ## Pipeline
//!
//! ```text
//! caller ─▶ normalize ─▶ credentials ─▶ Transport ─▶ unwrap_response ─▶ Reply
//!                                           │               │
//!                                           └──▶ classify ◀─┘  (on failure)
//! ```
//!
//! The credential and side-effect stages live in the `client` crate because
//! they touch shared state; everything here is pure.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ServiceName`, `RequestId`) |
//! | [`payload`] | The `Payload` value model and multipart forms |
//! | [`types`] | Options, session, transport boundary, and reply types |
//! | [`normalize`] | Parameter Normalizer |
//! | [`envelope`] | Envelope Unwrapper |
//! | [`classify`] | Error Classifier |
//! | [`errors`] | `ClassifiedError` and `ErrorKind` |
//! | [`ports`] | `Transport`, `CredentialStore`, `Notifier`, `Navigator` |

pub mod classify;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod normalize;
pub mod payload;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use classify::{classify, FailureReport};
pub use envelope::{unwrap_response, Envelope};
pub use errors::{ClassifiedError, ErrorKind};
pub use identifiers::{RequestId, ServiceName};
pub use normalize::{normalize, normalize_with};
pub use payload::{iso8601, FormPart, MultipartForm, PartContent, Payload};
pub use ports::{CredentialStore, CredentialStoreError, Navigator, Notifier, Transport};
pub use types::{
    FromReply, HttpMethod, OutgoingRequest, Reply, ReplyMismatch, RequestOptions, Session,
    TransportFailure, TransportResponse, TransportSignal,
};
