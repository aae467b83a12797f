//! Client Facade.
//!
//! A [`ServiceClient`] is bound to one registered backend. Its four verbs share
//! one pipeline:
//!
//! 1. normalize the query and body,
//! 2. attach static, per-call, and credential headers,
//! 3. send through the [`Transport`],
//! 4. unwrap the response envelope,
//! 5. on failure, classify and dispatch side effects.
//!
//! The only state a call touches beyond its own locals is the credential
//! store and the dispatcher's redirect guard.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    classify, normalize, unwrap_response, ClassifiedError, CredentialStore, FailureReport,
    FromReply, HttpMethod, OutgoingRequest, Payload, Reply, ReplyMismatch, RequestId,
    RequestOptions, ServiceName, Transport,
};
use tracing::{debug, info_span, warn, Instrument, Span};
use url::Url;

use crate::credentials::{credential_headers, set_header};
use crate::dispatch::SideEffectDispatcher;

const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A registered backend: a logical name bound to a base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    name: ServiceName,
    base_address: Url,
}

impl ServiceEndpoint {
    pub(crate) fn new(name: ServiceName, base_address: Url) -> Self {
        Self { name, base_address }
    }

    /// The logical service name.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// The base address every path is resolved against.
    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    /// Resolves `path` against the base address.
    ///
    /// Exactly one `/` separates the two; an absolute `http(s)://` path is
    /// used verbatim and an empty path yields the base address.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        let base = self.base_address.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_owned()
        } else {
            format!("{base}/{path}")
        }
    }
}

// ---------------------------------------------------------------------------
// Shared collaborators
// ---------------------------------------------------------------------------

/// State shared by every client of one registry.
pub(crate) struct Shared {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) dispatcher: SideEffectDispatcher,
    pub(crate) timeout: Duration,
    pub(crate) default_headers: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The request facade for one registered service.
///
/// Cheap to clone; clones share the registry's collaborators.
#[derive(Clone)]
pub struct ServiceClient {
    endpoint: ServiceEndpoint,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.shared.timeout)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    pub(crate) fn new(endpoint: ServiceEndpoint, shared: Arc<Shared>) -> Self {
        Self { endpoint, shared }
    }

    /// The endpoint this client is bound to.
    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// `GET path`, resolving to the envelope's `data` decoded as `T`.
    ///
    /// A non-enveloped response is decoded from its body as JSON; ask for
    /// `T = Reply` to receive it unchanged instead (file downloads).
    ///
    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for any transport, status, envelope, or
    /// decoding failure, after its side effects have been dispatched. A raw
    /// body that does not fit `T` is rejected without side effects: the
    /// backend did not fail, the caller asked for the wrong type.
    pub async fn get<T: FromReply>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClassifiedError> {
        self.call(HttpMethod::Get, path, None, options).await
    }

    /// `POST path` with a JSON or multipart body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::get`].
    pub async fn post<T: FromReply>(
        &self,
        path: &str,
        body: impl Into<Payload>,
        options: RequestOptions,
    ) -> Result<T, ClassifiedError> {
        self.call(HttpMethod::Post, path, Some(body.into()), options)
            .await
    }

    /// `PUT path` with a JSON or multipart body.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::get`].
    pub async fn put<T: FromReply>(
        &self,
        path: &str,
        body: impl Into<Payload>,
        options: RequestOptions,
    ) -> Result<T, ClassifiedError> {
        self.call(HttpMethod::Put, path, Some(body.into()), options)
            .await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceClient::get`].
    pub async fn delete<T: FromReply>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClassifiedError> {
        self.call(HttpMethod::Delete, path, None, options).await
    }

    /// Runs the pipeline and returns the untyped [`Reply`].
    ///
    /// Use this for responses that may not be enveloped (file downloads):
    /// they come back as [`Reply::Raw`] with status, headers, and body intact.
    ///
    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for any transport, status, or envelope
    /// failure, after its side effects have been dispatched.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<Reply, ClassifiedError> {
        let span = self.span(method, path);
        self.run(method, path, body, &options).instrument(span).await
    }

    async fn call<T: FromReply>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Payload>,
        options: RequestOptions,
    ) -> Result<T, ClassifiedError> {
        let span = self.span(method, path);
        async {
            let reply = self.run(method, path, body, &options).await?;
            match T::from_reply(reply) {
                Ok(value) => Ok(value),
                Err(ReplyMismatch::Data) => {
                    debug!("envelope data does not match the expected type");
                    Err(self.fail(FailureReport::undecodable(None), &options).await)
                }
                Err(ReplyMismatch::Raw { status }) => {
                    debug!(status, "raw body does not match the expected type");
                    Err(classify(&FailureReport::undecodable(Some(status))))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Payload>,
        options: &RequestOptions,
    ) -> Result<Reply, ClassifiedError> {
        let request = self.prepare(method, path, body, options).await;
        debug!(url = %request.url, "dispatching request");

        let outcome = match self.shared.transport.send(request).await {
            Ok(response) => {
                debug!(status = response.status, bytes = response.body.len(), "response received");
                unwrap_response(response)
            }
            Err(failure) => {
                debug!(error = %failure, signal = ?failure.signal, "no response received");
                Err(FailureReport::transport(failure))
            }
        };

        match outcome {
            Ok(reply) => Ok(reply),
            Err(report) => Err(self.fail(report, options).await),
        }
    }

    async fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Payload>,
        options: &RequestOptions,
    ) -> OutgoingRequest {
        let body = body.map(|b| normalize(&b));
        let query = options
            .query
            .as_ref()
            .map(|q| normalize(q).to_query_pairs())
            .unwrap_or_default();

        let mut headers = Vec::new();
        if !matches!(body, Some(Payload::Binary(_))) {
            headers.push((CONTENT_TYPE.to_owned(), JSON_CONTENT_TYPE.to_owned()));
        }
        for (name, value) in self.shared.default_headers.iter().chain(&options.headers) {
            set_header(&mut headers, name, value.clone());
        }
        let session = self.shared.credentials.session().await;
        for (name, value) in credential_headers(&session) {
            set_header(&mut headers, &name, value);
        }

        OutgoingRequest {
            method,
            url: self.endpoint.url_for(path),
            headers,
            query,
            body,
            timeout: self.shared.timeout,
        }
    }

    async fn fail(&self, report: FailureReport, options: &RequestOptions) -> ClassifiedError {
        let error = classify(&report);
        warn!(
            kind = %error.kind,
            status = ?error.status,
            code = ?error.code,
            message = %error.message,
            "request failed"
        );
        self.shared.dispatcher.dispatch(error, options).await
    }

    fn span(&self, method: HttpMethod, path: &str) -> Span {
        info_span!(
            "request",
            service = %self.endpoint.name,
            method = %method,
            path = %path,
            request_id = %RequestId::new_random(),
        )
    }
}
