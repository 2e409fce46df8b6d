//! Proxy subsystem: the request/response rewriting pipeline.
//!
//! - engine.rs: stage composition, event reporting
//! - transport.rs: outbound HTTP collaborator
//! - error.rs: pipeline error kinds

pub mod engine;
pub mod error;
pub mod transport;

pub use engine::ProxyEngine;
pub use error::ProxyError;
pub use transport::{OutboundRequest, ReqwestTransport, Transport, TransportError, UpstreamResponse};
