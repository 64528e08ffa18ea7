//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request flows produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters and latency histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to every per-request log line
//! - Metrics are cheap (atomic increments) and always recorded; exporting
//!   them is opt-in

pub mod logging;
pub mod metrics;
