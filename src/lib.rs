//! CORS proxy for Git smart-HTTP.
//!
//! Lets browser-based Git clients talk to Git hosts that do not send CORS
//! headers. Requests for `/<host>/<path>` are checked against the shape of
//! the smart-HTTP protocol and relayed to `https://<host>/<path>` with an
//! allow-listed set of headers; responses stream back with CORS headers.

// Core subsystems
pub mod config;
pub mod http;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
