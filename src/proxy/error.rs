//! Pipeline error kinds.

use thiserror::Error;

use crate::proxy::transport::TransportError;

/// Errors that abort the proxy pipeline for a single request.
///
/// Each variant maps to a fixed status code at the handler boundary
/// (see `http::response`).
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request path carried no target (`GET /`).
    #[error("Please specify a target URL path")]
    MissingTarget,

    /// Neither the request nor the configuration names the proxy's own host.
    #[error("Unable to determine proxy host")]
    MissingHost,

    /// The encoded path does not form a valid upstream URL.
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    /// The outbound call failed (network, DNS, timeout).
    #[error(transparent)]
    UpstreamUnreachable(#[from] TransportError),

    /// Buffering an HTML body for rewriting failed.
    #[error("failed to read upstream body: {0}")]
    UpstreamBody(String),

    /// The HTML rewrite pattern for the target host could not be built.
    #[error("failed to rewrite response body: {0}")]
    Rewrite(#[from] regex::Error),
}

impl ProxyError {
    /// Errors caused by the client's request rather than the proxy or upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxyError::MissingTarget | ProxyError::MissingHost | ProxyError::InvalidTarget(_)
        )
    }
}
