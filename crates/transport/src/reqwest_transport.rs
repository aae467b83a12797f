//! `reqwest`-backed [`Transport`].

use std::error::Error as _;

use async_trait::async_trait;
use pipeline::{
    HttpMethod, MultipartForm, OutgoingRequest, PartContent, Payload, Transport, TransportFailure,
    TransportResponse, TransportSignal,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use thiserror::Error;
use tracing::trace;

use crate::TransportConfig;

/// Error raised when the underlying HTTP client cannot be constructed.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// `reqwest` rejected the configuration (e.g. TLS initialisation failed).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP transport using a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with [`TransportConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn new() -> Result<Self, TransportBuildError> {
        Self::with_config(&TransportConfig::default())
    }

    /// Creates a transport with explicit connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn with_config(config: &TransportConfig) -> Result<Self, TransportBuildError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn build_multipart(form: &MultipartForm) -> Result<Form, TransportFailure> {
        let mut out = Form::new();
        for part in form.parts() {
            out = match &part.content {
                PartContent::Text(value) => out.text(part.name.clone(), value.clone()),
                PartContent::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file = Part::bytes(bytes.clone());
                    if let Some(file_name) = file_name {
                        file = file.file_name(file_name.clone());
                    }
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            TransportFailure::new(None, format!("invalid part content type: {e}"))
                        })?;
                    }
                    out.part(part.name.clone(), file)
                }
            };
        }
        Ok(out)
    }

    /// Maps a `reqwest` error to a transport failure, keeping the full source
    /// chain in the message.
    ///
    /// The request URL is stripped first: the classifier matches phrases in
    /// the message, and a path such as `/timeout-settings` must not read as a
    /// timeout.
    fn map_error(error: reqwest::Error) -> TransportFailure {
        let error = error.without_url();
        let signal = if error.is_timeout() {
            Some(TransportSignal::Timeout)
        } else if error.is_connect() {
            Some(TransportSignal::Network)
        } else {
            None
        };

        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        TransportFailure::new(signal, message)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportFailure> {
        let OutgoingRequest {
            method,
            url,
            headers,
            query,
            body,
            timeout,
        } = request;

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(method), url.as_str())
            .timeout(timeout);

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = match body {
            None => builder,
            Some(Payload::Binary(form)) => builder.multipart(Self::build_multipart(&form)?),
            Some(payload) => {
                let bytes = serde_json::to_vec(&payload).map_err(|e| {
                    TransportFailure::new(None, format!("failed to encode request body: {e}"))
                })?;
                builder.body(bytes)
            }
        };

        trace!(%method, %url, "sending");
        let response = builder.send().await.map_err(Self::map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(Self::map_error)?
            .to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_config() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn maps_every_verb() {
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Get), Method::GET);
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Post), Method::POST);
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Put), Method::PUT);
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[tokio::test]
    async fn failure_message_omits_request_url() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let error = Client::new()
            .get(format!("http://{address}/timeout-settings"))
            .send()
            .await
            .unwrap_err();
        let failure = ReqwestTransport::map_error(error);

        assert_eq!(failure.signal, Some(TransportSignal::Network));
        assert!(!failure.message.contains("timeout-settings"), "{}", failure.message);
    }

    #[test]
    fn rejects_invalid_part_mime() {
        let form = MultipartForm::new().file("doc", "a.bin", Some("not a mime"), vec![1]);
        assert!(ReqwestTransport::build_multipart(&form).is_err());
    }

    #[test]
    fn multipart_accepts_text_and_files() {
        let form = MultipartForm::new()
            .text("title", "Notes")
            .file("doc", "notes.md", Some("text/markdown"), b"# hi".to_vec());
        assert!(ReqwestTransport::build_multipart(&form).is_ok());
    }
}
