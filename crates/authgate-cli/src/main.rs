//! authgate - sign in to an API from the terminal and keep the session.
//!
//! The stored bearer token is verified at startup, attached to every request,
//! and dropped as soon as the server rejects it.

mod app;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use authgate_core::config::{Config, StorageBackend};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "authgate.log";

#[derive(Debug, Parser)]
#[command(name = "authgate", version, about = "Keep an authenticated API session from the terminal")]
struct Cli {
    /// API base URL (overrides config and AUTHGATE_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where the token is kept: file, keyring or memory
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, global = true, env = "AUTHGATE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show whether the stored session is still valid
    Status,
    /// Send an authenticated GET and print the JSON response
    Get { path: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_env()?;
    if let Some(ref url) = cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());
    info!("authgate starting");

    let config = load_config(&cli)?;
    let mut app = App::new(config)?;
    let result = app.run(cli.command).await;

    if app.login_required() {
        eprintln!("Session expired or was revoked. Run `authgate login` to sign in again.");
    }

    info!("authgate shutting down");
    result
}
