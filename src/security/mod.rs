//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request → access_control.rs (is this a Git smart-HTTP exchange?)
//!         → headers.rs (which request headers go upstream)
//! Upstream response → headers.rs (which response headers come back)
//! ```
//!
//! # Design Decisions
//! - Everything here is pure and synchronous
//! - Rejections never carry an explanation back to the client

pub mod access_control;
pub mod headers;

pub use access_control::is_allowed;
