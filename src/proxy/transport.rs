//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Send the sanitized request to the target origin
//! - Never follow redirects (the engine rewrites them itself)
//! - Stream request and response bodies without buffering
//! - Enforce connect and idle-read timeouts
//!
//! # Design Decisions
//! - `Transport` is a trait so the engine can be driven by a scripted
//!   transport in tests
//! - No retries: a failed call surfaces immediately
//! - No total deadline here: streamed bodies may outlive any fixed budget.
//!   The engine bounds the wait for the response head instead
//! - The inbound `Accept-Encoding` is replaced by the client's own, so
//!   compressed responses are decoded before the engine sees them

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::{ProxySettings, TimeoutConfig};

/// Request handed to the transport.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Inbound body, passed through as a stream. `None` for bodiless methods.
    pub body: Option<Body>,
}

/// Raw response from the target, before any rewriting.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Reason phrase as sent by the target, when it differs from the
    /// canonical one for `status`.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Failure of the outbound call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("failed to connect to upstream: {0}")]
    Connect(String),

    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(error_chain(&e))
        } else {
            TransportError::Request(error_chain(&e))
        }
    }
}

/// Render an error with its sources, e.g. `error sending request: dns error: ...`.
fn error_chain(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The outbound HTTP client collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request with a manual redirect policy.
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Production transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: &TimeoutConfig, settings: &ProxySettings) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .read_timeout(Duration::from_secs(timeouts.idle_secs));

        if !settings.use_env_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Client(error_chain(&e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "Sending upstream request"
        );

        let mut headers = request.headers;
        // reqwest only decodes encodings it negotiated itself.
        headers.remove(header::ACCEPT_ENCODING);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);

        if let Some(body) = request.body {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = builder.send().await?;
        let status = response.status();
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());
        let headers = response.headers().clone();

        Ok(UpstreamResponse {
            status,
            reason,
            headers,
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}

/// Whether a request with this method forwards its body upstream.
pub fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}
