//! Inbound request inspection.
//!
//! # Responsibilities
//! - Determine the scheme and authority the client used to reach the proxy
//! - Capture client metadata for event records
//! - Open a per-request tracing span with a unique request ID
//!
//! # Design Decisions
//! - Configured public scheme/host win over anything the request claims
//! - `cf-connecting-ip` is preferred over the socket peer address, since
//!   the proxy commonly runs behind a CDN

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Request, Uri};
use tracing::Span;
use uuid::Uuid;

use crate::config::ProxySettings;
use crate::proxy::error::ProxyError;

/// Header carrying the original client address when behind Cloudflare.
pub const CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Per-request facts the pipeline needs besides the request itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Scheme the proxy was reached on, without `://`.
    pub scheme: String,
    /// The proxy's own authority.
    pub proxy_host: String,
    /// Client address, for event records.
    pub client_ip: Option<String>,
}

impl RequestContext {
    /// Derive the context for a request.
    ///
    /// `tls` reports whether the listener terminated TLS for this connection.
    pub fn from_request<B>(
        request: &Request<B>,
        settings: &ProxySettings,
        tls: bool,
        peer: Option<SocketAddr>,
    ) -> Result<Self, ProxyError> {
        let scheme = settings
            .public_scheme
            .clone()
            .unwrap_or_else(|| if tls { "https" } else { "http" }.to_string());

        let proxy_host = settings
            .public_host
            .clone()
            .or_else(|| request_authority(request.uri(), request.headers()))
            .ok_or(ProxyError::MissingHost)?;

        Ok(Self {
            scheme,
            proxy_host,
            client_ip: client_ip(request.headers(), peer),
        })
    }
}

/// Client address: the CDN-supplied header, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_string(headers, CLIENT_IP_HEADER).or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Authority from the request target (HTTP/2) or the `Host` header (HTTP/1.1).
fn request_authority(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    uri.authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| header_string(headers, header::HOST.as_str()))
        .filter(|host| !host.is_empty())
}

/// A header's value as a string, if present and visible ASCII.
pub fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Span factory for `TraceLayer`: one span per request, tagged with a fresh ID.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!(
        "request",
        %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, host: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header("Host", host);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_scheme_from_listener() {
        let req = request("/foo.com/", Some("proxy.test"));
        let settings = ProxySettings::default();

        let ctx = RequestContext::from_request(&req, &settings, false, None).unwrap();
        assert_eq!(ctx.scheme, "http");

        let ctx = RequestContext::from_request(&req, &settings, true, None).unwrap();
        assert_eq!(ctx.scheme, "https");
    }

    #[test]
    fn test_configured_identity_wins() {
        let req = request("/foo.com/", Some("10.0.0.5:8080"));
        let settings = ProxySettings {
            public_scheme: Some("https".to_string()),
            public_host: Some("proxy.example".to_string()),
            ..ProxySettings::default()
        };

        let ctx = RequestContext::from_request(&req, &settings, false, None).unwrap();
        assert_eq!(ctx.scheme, "https");
        assert_eq!(ctx.proxy_host, "proxy.example");
    }

    #[test]
    fn test_host_from_header_or_authority() {
        let settings = ProxySettings::default();

        let req = request("/foo.com/", Some("proxy.test:8443"));
        let ctx = RequestContext::from_request(&req, &settings, false, None).unwrap();
        assert_eq!(ctx.proxy_host, "proxy.test:8443");

        let req = request("http://proxy.h2/foo.com/", None);
        let ctx = RequestContext::from_request(&req, &settings, false, None).unwrap();
        assert_eq!(ctx.proxy_host, "proxy.h2");
    }

    #[test]
    fn test_missing_host() {
        let req = request("/foo.com/", None);
        let err = RequestContext::from_request(&req, &ProxySettings::default(), false, None)
            .unwrap_err();
        assert!(matches!(err, ProxyError::MissingHost));
    }

    #[test]
    fn test_client_ip_prefers_cdn_header() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        let settings = ProxySettings::default();

        let req = request("/foo.com/", Some("proxy.test"));
        let ctx = RequestContext::from_request(&req, &settings, false, Some(peer)).unwrap();
        assert_eq!(ctx.client_ip.as_deref(), Some("192.0.2.1"));

        let req = Request::builder()
            .uri("/foo.com/")
            .header("Host", "proxy.test")
            .header(CLIENT_IP_HEADER, "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let ctx = RequestContext::from_request(&req, &settings, false, Some(peer)).unwrap();
        assert_eq!(ctx.client_ip.as_deref(), Some("203.0.113.7"));
    }
}
