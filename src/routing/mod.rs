//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (scheme, path, query)
//!     → target.rs (decode first path segment into the upstream origin)
//!     → Return: TargetLocator or a client error
//! ```
//!
//! # Design Decisions
//! - No route table: the destination is encoded in the request path itself
//! - Deterministic: same input always resolves to the same target
//! - Host syntax is only validated as far as URL parsing enforces it

pub mod target;

pub use target::{resolve, TargetLocator};
