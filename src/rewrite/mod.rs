//! Response rewriting.
//!
//! # Data Flow
//! ```text
//! Upstream response
//!     → location.rs (re-encode redirects into the proxy's path scheme)
//!     → html.rs (text/html bodies only: rewrite absolute and root-relative URLs)
//!     → Returned to client
//! ```
//!
//! # Design Decisions
//! - Textual, best-effort rewriting; no HTML parsing
//! - Non-HTML bodies are never touched
//! - A redirect that cannot be rewritten is kept as-is, never fatal

pub mod html;
pub mod location;

pub use html::rewrite_html;
pub use location::{rewrite_location, rewrite_location_header, LocationError};

/// Everything the rewriters need to map a target URL onto the proxy.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// Scheme the proxy was reached on.
    pub scheme: &'a str,
    /// The proxy's own authority.
    pub proxy_host: &'a str,
    /// Authority of the current target.
    pub target_host: &'a str,
}

impl RewriteContext<'_> {
    /// `{scheme}://{proxy_host}/{host}`, the proxy-routed origin for `host`.
    pub fn proxied_origin(&self, host: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.proxy_host, host)
    }
}
