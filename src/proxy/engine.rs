//! The rewriting proxy pipeline.
//!
//! # Data Flow
//! ```text
//! Request<Body> + RequestContext
//!     → routing::target::resolve          (path → TargetLocator)
//!     → security::headers (outbound)      (strip, force Host, Referer)
//!     → Transport::send                   (manual redirects, streamed body)
//!     → rewrite::location                 (Location → proxy-routed)
//!     → security::headers (inbound)       (CORS on, CSP & co. off)
//!     → rewrite::html                     (text/html only, buffered)
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Every request is handled independently; the engine holds no per-request state
//! - Errors are values until the outermost boundary, where they become responses
//! - Non-200 upstream statuses and all errors are reported to the event sink

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tokio::time::{self, Instant};

use crate::http::request::{header_string, RequestContext};
use crate::observability::events::{EventOutcome, EventSink, ProxyEvent};
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::transport::{
    carries_body, OutboundRequest, Transport, TransportError, UpstreamResponse,
};
use crate::rewrite::{self, RewriteContext};
use crate::routing::{self, TargetLocator};
use crate::security::headers::{sanitize_request_headers, sanitize_response_headers};

/// Rewriting proxy engine: one instance serves every request.
#[derive(Clone)]
pub struct ProxyEngine {
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventSink>,
    max_html_body_bytes: usize,
    /// Deadline for the upstream response head and, for HTML, its full body.
    upstream_timeout: Duration,
}

impl ProxyEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventSink>,
        max_html_body_bytes: usize,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            events,
            max_html_body_bytes,
            upstream_timeout,
        }
    }

    /// Report a request rejected before it reached the pipeline.
    pub fn record_rejection<B>(
        &self,
        request: &Request<B>,
        client_ip: Option<String>,
        err: &ProxyError,
    ) {
        let caller = Caller::new(request.method(), request.headers(), client_ip);
        self.record(caller.event(request.uri().to_string(), EventOutcome::Error {
            error: err.to_string(),
        }));
    }

    /// Proxy one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: Request<Body>, ctx: &RequestContext) -> Response {
        let (parts, body) = request.into_parts();
        let caller = Caller::new(&parts.method, &parts.headers, ctx.client_ip.clone());

        let target = match routing::resolve(&ctx.scheme, parts.uri.path(), parts.uri.query()) {
            Ok(target) => target,
            Err(err) => {
                tracing::debug!(uri = %parts.uri, error = %err, "Target resolution failed");
                self.record(caller.event(parts.uri.to_string(), EventOutcome::Error {
                    error: err.to_string(),
                }));
                return err.into_response();
            }
        };

        match self.forward(parts, body, &target, ctx, &caller).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(url = %target.url(), error = %err, "Proxy request failed");
                if matches!(err, ProxyError::UpstreamUnreachable(_)) {
                    metrics::record_upstream_error();
                }
                self.record(caller.event(target.url().to_string(), EventOutcome::Error {
                    error: err.to_string(),
                }));
                err.into_response()
            }
        }
    }

    async fn forward(
        &self,
        parts: Parts,
        body: Body,
        target: &TargetLocator,
        ctx: &RequestContext,
        caller: &Caller,
    ) -> Result<Response, ProxyError> {
        let deadline = Instant::now() + self.upstream_timeout;
        let headers = sanitize_request_headers(&parts.headers, target)?;
        let outbound = OutboundRequest {
            body: carries_body(&parts.method).then_some(body),
            method: parts.method,
            url: target.url().clone(),
            headers,
        };

        let UpstreamResponse {
            status,
            reason,
            headers: mut response_headers,
            body: upstream_body,
        } = time::timeout_at(deadline, self.transport.send(outbound))
            .await
            .map_err(|_| TransportError::Timeout)??;

        tracing::debug!(url = %target.url(), status = %status, "Upstream responded");

        if status != StatusCode::OK {
            self.record(caller.event(target.url().to_string(), EventOutcome::Status {
                status: status.as_u16(),
                status_text: reason
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string()),
            }));
        }

        let rewrite_ctx = RewriteContext {
            scheme: &ctx.scheme,
            proxy_host: &ctx.proxy_host,
            target_host: target.host(),
        };

        let rewrite_body = is_html(&response_headers) && !is_encoded(&response_headers);

        rewrite::rewrite_location_header(&mut response_headers, &rewrite_ctx);
        sanitize_response_headers(&mut response_headers);

        let body = if rewrite_body {
            let bytes = time::timeout_at(
                deadline,
                axum::body::to_bytes(upstream_body, self.max_html_body_bytes),
            )
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;
            let html = String::from_utf8_lossy(&bytes);
            let rewritten = rewrite::rewrite_html(&html, &rewrite_ctx)?;
            response_headers.remove(header::CONTENT_LENGTH);
            metrics::record_html_rewrite();
            Body::from(rewritten)
        } else {
            upstream_body
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }

    fn record(&self, event: ProxyEvent) {
        if let Err(e) = self.events.record(&event) {
            tracing::warn!(error = %e, "Failed to record proxy event");
        }
    }
}

/// Whether the response is an HTML document.
fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).contains("text/html"))
        .unwrap_or(false)
}

/// A body still carrying a content coding the client did not decode
/// cannot be rewritten as text; it is passed through instead.
fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.trim().eq_ignore_ascii_case("identity"))
        .unwrap_or(false)
}

/// Inbound request metadata captured for event records.
struct Caller {
    method: String,
    client_ip: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
}

impl Caller {
    fn new(method: &Method, headers: &HeaderMap, client_ip: Option<String>) -> Self {
        Self {
            method: method.to_string(),
            client_ip,
            user_agent: header_string(headers, header::USER_AGENT.as_str()),
            referer: header_string(headers, header::REFERER.as_str()),
        }
    }

    fn event(&self, url: String, outcome: EventOutcome) -> ProxyEvent {
        ProxyEvent {
            timestamp: Utc::now(),
            url,
            outcome,
            method: self.method.clone(),
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
        }
    }
}
