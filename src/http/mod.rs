//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → request.rs (request ID)
//!     → server.rs (dispatch)
//!         → cors.rs (CORS headers, preflight short-circuit)
//!         → security::access_control (is it Git smart-HTTP?)
//!         → target.rs (which upstream host and path)
//!         → forward.rs (upstream fetch, body relay via relay.rs)
//!         → response.rs (status, exposed headers, Location rewrite)
//!         → outcome.rs (terminal status or next handler on rejection)
//!     → client
//! ```

pub mod cors;
pub mod forward;
pub mod landing;
pub mod outcome;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;
pub mod target;

pub use outcome::Mode;
pub use server::{mount, AppState, HttpServer};
