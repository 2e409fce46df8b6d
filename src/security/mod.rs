//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → headers.rs (drop identity/topology headers, force Host)
//!
//! Inbound response:
//!     → headers.rs (permissive CORS, strip CSP and credential negotiation)
//! ```
//!
//! Inbound body size is bounded by a tower-http limit layer in `http::server`.

pub mod headers;
