//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Init logging/metrics → Bind → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → broadcast → Stop accepting → Drain → Remove PID file
//!
//! Daemon (daemon.rs):
//!     start → spawn detached `run`, write PID file
//!     stop/status → read PID file, probe or signal the process
//! ```

pub mod daemon;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
