//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to every request flow
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never mutated afterwards
//! - All fields have defaults so the proxy runs with no file at all
//! - Environment variables win over the file (`ALLOW_ORIGIN`,
//!   `INSECURE_HTTP_ORIGINS`, `DEBUG`)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{CorsConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, UpstreamConfig};
