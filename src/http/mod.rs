//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, fixed routes, middleware)
//!     → request.rs (scheme, proxy host, client metadata, request span)
//!     → proxy::engine (rewriting pipeline)
//!     → response.rs (error mapping, fixed responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::RequestContext;
pub use server::HttpServer;
