//! Path-encoded rewriting HTTP proxy.
//!
//! `https://proxy.example/<host>/<path>?q` is forwarded to
//! `https://<host>/<path>?q`; redirects and HTML links in the response are
//! rewritten so navigation stays routed through the proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod rewrite;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyEngine, ProxyError};
