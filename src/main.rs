//! git-cors-proxy
//!
//! ```text
//!   browser ──▶ /github.com/user/repo.git/info/refs?service=git-upload-pack
//!                  │
//!                  │  CORS headers, smart-HTTP check, header allow-list
//!                  ▼
//!              https://github.com/user/repo.git/info/refs?service=git-upload-pack
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use git_cors_proxy::config;
use git_cors_proxy::lifecycle::daemon::{self, PidFile, Stopped};
use git_cors_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "git-cors-proxy")]
#[command(about = "CORS proxy for Git smart-HTTP", version, long_about = None)]
struct Cli {
    /// Port to listen on (default: 9999)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to PID file
    #[arg(long, default_value_os_t = PidFile::default_path())]
    pid: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the CORS proxy server in the foreground
    Run,
    /// Start the CORS proxy server daemon
    Start,
    /// Stop the CORS proxy server daemon
    Stop,
    /// Show the status of the CORS proxy server daemon
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let pid_file = PidFile::new(&cli.pid);

    match cli.command {
        None => {
            let _ = Cli::command().print_help();
            ExitCode::SUCCESS
        }
        Some(Commands::Run) => {
            let mut config = match config::load(cli.config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(port) = cli.port {
                config.listener.set_port(port);
            }

            match startup::run(config, pid_file).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Start) => {
            let program = match std::env::current_exe() {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Cannot locate own executable: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            let mut args = vec!["run".to_string(), format!("--pid={}", cli.pid.display())];
            if let Some(port) = cli.port {
                args.push(format!("--port={}", port));
            }
            if let Some(path) = &cli.config {
                args.push(format!("--config={}", path.display()));
            }

            match daemon::start(&pid_file, &program, &args) {
                Ok(started) => {
                    if started.removed_stale {
                        eprintln!("Removed stale PID file");
                    }
                    println!("Started CORS proxy server with PID {}", started.pid);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e, true),
            }
        }
        Some(Commands::Stop) => match daemon::stop(&pid_file) {
            Ok(Stopped::Signalled(pid)) => {
                println!("Stopped daemon (pid {})", pid);
                ExitCode::SUCCESS
            }
            Ok(Stopped::StaleRemoved(_)) => {
                eprintln!("Removed stale PID file");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e, true),
        },
        Some(Commands::Status) => match daemon::status(&pid_file) {
            Ok(recorded) if recorded.alive => {
                eprintln!("Daemon is running as pid {}", recorded.pid);
                ExitCode::SUCCESS
            }
            Ok(_) => {
                eprintln!("Not running, stale PID file");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e, false),
        },
    }
}

fn fail(e: daemon::DaemonError, strict: bool) -> ExitCode {
    eprintln!("{}", e);
    ExitCode::from(e.exit_code(strict) as u8)
}
