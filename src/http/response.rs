//! Fixed responses and error mapping.
//!
//! # Responsibilities
//! - Map pipeline errors to status codes and plain-text bodies
//! - Serve the fixed `robots.txt` and CORS preflight responses
//!
//! # Design Decisions
//! - Client mistakes (no target, bad target) are 400
//! - Upstream and rewrite failures are 500 with the cause in the body

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::error::ProxyError;
use crate::security::headers::{apply_cors, CORS_MAX_AGE};

pub const PLAIN_TEXT_UTF8: &str = "text/plain;charset=utf-8";

pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /";

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = if self.is_client_error() {
            self.to_string()
        } else {
            format!("Proxy error: {self}")
        };
        plain_text(self.status(), body)
    }
}

/// A `text/plain` response with the given status.
pub fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PLAIN_TEXT_UTF8),
    );
    response
}

/// `GET /robots.txt`: disallow all crawling.
pub fn robots_txt() -> Response {
    (StatusCode::OK, ROBOTS_TXT).into_response()
}

/// Response to any `OPTIONS` request.
pub fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    apply_cors(headers);
    headers.insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static(CORS_MAX_AGE),
    );
    response
}
