//! Target resolution.
//!
//! Decodes the proxy's path encoding into the upstream URL:
//!
//! ```text
//! {scheme}://{proxy_host}/{target_host}/{target_path}?{query}
//!     → {scheme}://{target_host}/{target_path}?{query}
//! ```
//!
//! # Design Decisions
//! - The target scheme is always the scheme the proxy was reached on
//! - A full URL used as the first segment (`/https://host/...`) is tolerated
//! - The query string is copied verbatim and never rewritten

use url::Url;

use crate::proxy::error::ProxyError;

/// Scheme prefixes tolerated at the start of the encoded path.
const SCHEME_PREFIXES: [&str; 2] = ["http://", "https://"];

/// The resolved destination of a proxied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocator {
    scheme: String,
    host: String,
    url: Url,
}

impl TargetLocator {
    /// Scheme inherited from the inbound request (`http` or `https`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Target authority (`host[:port]`), as sent in the `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Full upstream URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Encode this target back into the proxy's path scheme.
    ///
    /// This is the inverse of [`resolve`]: resolving the path and query of
    /// the returned URL yields an equal locator.
    pub fn proxy_url(&self, proxy_host: &str) -> String {
        let query = self.query().map(|q| format!("?{q}")).unwrap_or_default();
        format!(
            "{}://{}/{}{}{}",
            self.scheme,
            proxy_host,
            self.host,
            self.path(),
            query
        )
    }
}

/// Resolve an inbound path and query into a [`TargetLocator`].
///
/// `scheme` is the scheme the proxy itself was reached on.
pub fn resolve(scheme: &str, path: &str, query: Option<&str>) -> Result<TargetLocator, ProxyError> {
    let encoded = path.strip_prefix('/').unwrap_or(path);
    if encoded.is_empty() {
        return Err(ProxyError::MissingTarget);
    }

    let remaining = SCHEME_PREFIXES
        .iter()
        .find_map(|prefix| encoded.strip_prefix(prefix))
        .unwrap_or(encoded);

    let mut url = Url::parse(&format!("{scheme}://{remaining}"))
        .map_err(|e| ProxyError::InvalidTarget(format!("{remaining}: {e}")))?;
    url.set_query(query.filter(|q| !q.is_empty()));

    let host = authority(&url)
        .ok_or_else(|| ProxyError::InvalidTarget(format!("{remaining}: missing host")))?;

    Ok(TargetLocator {
        scheme: scheme.to_string(),
        host,
        url,
    })
}

/// `host[:port]` of a URL, omitting the scheme's default port.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
