//! Header sanitization in both directions.
//!
//! # Responsibilities
//! - Strip headers that leak client identity or proxy topology before forwarding
//! - Force `Host` to the target and synthesize a same-origin `Referer` for
//!   sub-resource requests
//! - Normalize CORS on responses and strip headers that block content under
//!   the proxy's origin
//! - Strip hop-by-hop headers (the client and server re-frame bodies)
//!
//! # Design Decisions
//! - Header lists are constants, never mutated at runtime
//! - `HeaderMap` normalizes names to lowercase, so every lookup here is
//!   case-insensitive

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::proxy::error::ProxyError;
use crate::routing::TargetLocator;

/// Request headers never forwarded to the target.
pub const FORBIDDEN_REQUEST_HEADERS: &[&str] = &[
    "referer",
    "origin",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-dest",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "proxy-authorization",
    "proxy-connection",
    "forwarded",
    "x-forwarded-for",
    "x-forwarded-host",
    "x-forwarded-proto",
    "via",
];

/// Connection-scoped headers, meaningful for a single hop only.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Response headers removed before returning to the client.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "clear-site-data",
    "access-control-allow-origin-list",
    "access-control-allow-credentials",
    "access-control-request-headers",
    "access-control-request-method",
    "origin",
];

/// CORS headers set on every proxied response.
pub const CORS_RESPONSE_HEADERS: &[(&str, &str)] = &[
    ("access-control-expose-headers", "*"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("access-control-allow-headers", "*"),
];

/// Preflight cache lifetime in seconds.
pub const CORS_MAX_AGE: &str = "86400";

/// Build the header map sent to the target.
pub fn sanitize_request_headers(
    inbound: &HeaderMap,
    target: &TargetLocator,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 2);

    for (name, value) in inbound {
        let name_str = name.as_str();
        if FORBIDDEN_REQUEST_HEADERS.contains(&name_str) || HOP_BY_HOP_HEADERS.contains(&name_str) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    headers.insert(header::HOST, header_value(target.host())?);

    // Sub-resource requests get a same-origin referer; many origins reject
    // them otherwise.
    let is_subresource = inbound
        .get(header::ACCEPT)
        .map(|accept| !String::from_utf8_lossy(accept.as_bytes()).contains("text/html"))
        .unwrap_or(false);
    if is_subresource {
        let referer = format!("{}://{}/", target.scheme(), target.host());
        headers.insert(header::REFERER, header_value(&referer)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, ProxyError> {
    HeaderValue::from_str(value)
        .map_err(|_| ProxyError::InvalidTarget(format!("{value}: not a valid header value")))
}

/// Normalize upstream response headers in place.
///
/// `Location` rewriting happens separately (see `rewrite::location`).
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    apply_cors(headers);

    for name in STRIPPED_RESPONSE_HEADERS.iter().chain(HOP_BY_HOP_HEADERS) {
        headers.remove(*name);
    }
}

/// Set the permissive CORS headers.
pub fn apply_cors(headers: &mut HeaderMap) {
    for (name, value) in CORS_RESPONSE_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::resolve;

    fn target() -> TargetLocator {
        resolve("https", "/foo.com/page", None).unwrap()
    }

    #[test]
    fn test_forbidden_headers_dropped_any_case() {
        let mut inbound = HeaderMap::new();
        for (i, name) in FORBIDDEN_REQUEST_HEADERS.iter().enumerate() {
            let cased = if i % 2 == 0 {
                name.to_uppercase()
            } else {
                name.to_string()
            };
            let name = HeaderName::from_bytes(cased.as_bytes()).unwrap();
            inbound.insert(name, HeaderValue::from_static("leak"));
        }
        inbound.insert("user-agent", HeaderValue::from_static("test-agent"));

        let headers = sanitize_request_headers(&inbound, &target()).unwrap();

        for name in FORBIDDEN_REQUEST_HEADERS {
            if *name == "referer" {
                continue;
            }
            assert!(headers.get(*name).is_none(), "{name} should be dropped");
        }
        // No Accept header: the client's referer is not replaced.
        assert!(headers.get(header::REFERER).is_none());
        assert_eq!(headers.get("user-agent").unwrap(), "test-agent");
    }

    #[test]
    fn test_host_forced_to_target() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("proxy.test"));

        let headers = sanitize_request_headers(&inbound, &target()).unwrap();
        assert_eq!(headers.get(header::HOST).unwrap(), "foo.com");
        assert_eq!(headers.get_all(header::HOST).iter().count(), 1);
    }

    #[test]
    fn test_referer_synthesized_for_subresources() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, HeaderValue::from_static("image/webp,*/*"));
        inbound.insert(header::REFERER, HeaderValue::from_static("https://proxy.test/foo.com/"));

        let headers = sanitize_request_headers(&inbound, &target()).unwrap();
        assert_eq!(headers.get(header::REFERER).unwrap(), "https://foo.com/");
    }

    #[test]
    fn test_no_referer_for_navigation() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        inbound.insert(header::REFERER, HeaderValue::from_static("https://proxy.test/"));

        let headers = sanitize_request_headers(&inbound, &target()).unwrap();
        assert!(headers.get(header::REFERER).is_none());
    }

    #[test]
    fn test_hop_by_hop_dropped_and_multi_values_kept() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        inbound.append("x-custom", HeaderValue::from_static("a"));
        inbound.append("x-custom", HeaderValue::from_static("b"));

        let headers = sanitize_request_headers(&inbound, &target()).unwrap();
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        let values: Vec<_> = headers.get_all("x-custom").iter().collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn test_response_headers_normalized() {
        let mut headers = HeaderMap::new();
        headers.insert("content-security-policy", HeaderValue::from_static("default-src 'self'"));
        headers.insert(
            "content-security-policy-report-only",
            HeaderValue::from_static("default-src 'self'"),
        );
        headers.insert("clear-site-data", HeaderValue::from_static("\"cookies\""));
        headers.insert("access-control-allow-origin", HeaderValue::from_static("https://foo.com"));
        headers.insert("access-control-allow-credentials", HeaderValue::from_static("true"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));

        sanitize_response_headers(&mut headers);

        for name in STRIPPED_RESPONSE_HEADERS {
            assert!(headers.get(*name).is_none(), "{name} should be removed");
        }
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(headers.get("access-control-expose-headers").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-allow-methods").unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/css");
    }
}
