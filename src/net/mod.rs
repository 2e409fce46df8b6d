//! Network layer.
//!
//! Plain TCP listeners are bound in `main` and handed to the HTTP server;
//! tls.rs loads certificates when the listener terminates TLS itself.

pub mod tls;
