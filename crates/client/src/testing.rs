//! In-memory doubles for the UI-facing ports and the transport.
//!
//! Used by this workspace's tests and available to downstream crates that
//! want to exercise a [`crate::ServiceRegistry`] without a network or a UI.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use pipeline::{Navigator, Notifier, OutgoingRequest, Transport, TransportFailure, TransportResponse};

/// Records every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Returns the notifications shown so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_owned());
    }
}

/// Records redirects without changing its reported location.
///
/// The location only moves through [`RecordingNavigator::navigate`].
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Creates a navigator that reports `location` as the current view.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Moves the reported location, as a user following a link would.
    pub fn navigate(&self, location: impl Into<String>) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location.into();
    }

    /// Returns the redirect targets requested so far.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn redirect(&self, target: &str) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_owned());
    }
}

/// A transport that replays queued outcomes and records what it was sent.
///
/// Once the queue is exhausted every call fails with a transport failure
/// carrying no signal.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<TransportResponse, TransportFailure>>>,
    sent: Mutex<Vec<OutgoingRequest>>,
}

impl ScriptedTransport {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with a JSON body.
    #[must_use]
    pub fn respond_json(self, status: u16, body: serde_json::Value) -> Self {
        self.respond(TransportResponse {
            status,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: body.to_string().into_bytes(),
        })
    }

    /// Queues a raw response.
    #[must_use]
    pub fn respond(self, response: TransportResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn fail(self, failure: TransportFailure) -> Self {
        self.push(Err(failure));
        self
    }

    /// Returns the requests sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, outcome: Result<TransportResponse, TransportFailure>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportFailure> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::new(None, "no scripted response left")))
    }
}
