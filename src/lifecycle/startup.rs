//! Startup orchestration for the foreground server.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Logging comes up right after config, before anything can log
//! - The listener binds last, once everything else is ready

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::daemon::PidFile;
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// Serve in the foreground until SIGINT/SIGTERM.
///
/// On the way out the PID file is removed if it names this process.
pub async fn run(config: ProxyConfig, pid_file: PidFile) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(config.observability.log_format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        debug = config.observability.debug,
        "git-cors-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    let result = server.run(listener, shutdown.subscribe()).await;

    tracing::info!("Shutting down server");
    match pid_file.remove_if_owned(std::process::id()) {
        Ok(true) => tracing::debug!(path = %pid_file.path().display(), "Removed PID file"),
        Ok(false) => {}
        Err(e) => tracing::warn!(path = %pid_file.path().display(), error = %e, "Failed to remove PID file"),
    }

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
