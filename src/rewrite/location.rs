//! Redirect (`Location`) rewriting.
//!
//! - Absolute (`http://` / `https://`): the redirect's own host becomes the
//!   first path segment on the proxy
//! - Root-relative (`/x`): resolved against the current target host
//! - Anything else (`page.html`, `../x`): left unmodified. Such redirects
//!   resolve against the proxy origin and may break navigation.

use axum::http::header::{self, HeaderMap, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::rewrite::RewriteContext;
use crate::routing::target::authority;

/// A `Location` value that could not be rewritten.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location header is not valid UTF-8")]
    NotUtf8,

    #[error("invalid redirect URL {location:?}: {source}")]
    InvalidUrl {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("redirect URL {0:?} has no host")]
    MissingHost(String),

    #[error("rewritten location {0:?} is not a valid header value")]
    InvalidHeaderValue(String),
}

/// Rewrite a single `Location` value.
///
/// Returns `Ok(None)` when the value is left unmodified by policy.
pub fn rewrite_location(
    location: &str,
    ctx: &RewriteContext<'_>,
) -> Result<Option<String>, LocationError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location).map_err(|source| LocationError::InvalidUrl {
            location: location.to_string(),
            source,
        })?;
        let host = authority(&url).ok_or_else(|| LocationError::MissingHost(location.to_string()))?;
        let query = match url.query() {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        };
        return Ok(Some(format!(
            "{}{}{}",
            ctx.proxied_origin(&host),
            url.path(),
            query
        )));
    }

    if location.starts_with('/') {
        return Ok(Some(format!(
            "{}{}",
            ctx.proxied_origin(ctx.target_host),
            location
        )));
    }

    Ok(None)
}

/// Rewrite the `Location` header of a response in place.
///
/// Failures are logged and the original header is kept.
pub fn rewrite_location_header(headers: &mut HeaderMap, ctx: &RewriteContext<'_>) {
    let Some(original) = headers.get(header::LOCATION) else {
        return;
    };

    let rewritten = original
        .to_str()
        .map_err(|_| LocationError::NotUtf8)
        .and_then(|location| rewrite_location(location, ctx))
        .and_then(|rewritten| {
            rewritten
                .map(|value| {
                    HeaderValue::from_str(&value).map_err(|_| LocationError::InvalidHeaderValue(value))
                })
                .transpose()
        });

    match rewritten {
        Ok(Some(value)) => {
            tracing::debug!(
                from = ?original,
                to = ?value,
                "Rewrote redirect location"
            );
            headers.insert(header::LOCATION, value);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                location = ?original,
                error = %e,
                "Error processing redirect, keeping original location"
            );
        }
    }
}
