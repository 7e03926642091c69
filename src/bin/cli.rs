//! Permit Watcher CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use permit_watcher::{error::Result, models::Config, pipeline};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Permit Watcher - Recreation.gov availability alerts
#[derive(Parser, Debug)]
#[command(
    name = "permit-watcher",
    version,
    about = "Polls permit availability and sends SMS alerts"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "permit-watcher.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every permit on the configured interval until interrupted
    Run,

    /// Run a single poll cycle and exit
    Check,

    /// Validate the configuration file
    Validate,

    /// Send a test SMS through the configured transport
    TestSms,
}

/// Initialize logging; `--verbose` overrides the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    log::warn!("Failed to register SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => log::info!("SIGINT (Ctrl+C) received, shutting down"),
            _ = terminate => log::info!("SIGTERM received, shutting down"),
        }

        shutdown.cancel();
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Twilio credentials may live in a local .env file
    let dotenv = dotenvy::dotenv();

    let config = Config::load(&cli.config);
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    if let Ok(path) = &dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config = config.inspect_err(|e| log::error!("{}", e))?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            let shutdown = CancellationToken::new();
            spawn_signal_handler(shutdown.clone());

            log::info!("Permit watcher starting...");
            let cycles = pipeline::run_watcher(&config, shutdown)
                .await
                .inspect_err(|e| log::error!("Startup failed: {}", e))?;
            log::info!("Permit watcher stopped after {} cycle(s)", cycles);
        }

        Command::Check => {
            let shutdown = CancellationToken::new();
            spawn_signal_handler(shutdown.clone());

            let report = pipeline::check_once(&config, shutdown)
                .await
                .inspect_err(|e| log::error!("Check failed: {}", e))?;
            println!("{report}");
        }

        Command::Validate => {
            config
                .validate()
                .inspect_err(|e| log::error!("Configuration invalid: {}", e))?;
            let permits = config.monitored_permits()?;

            log::info!("Configuration is valid");
            for permit in &permits {
                log::info!(
                    "  {} ({}): category={}, target dates={}",
                    permit.name,
                    permit.id,
                    permit.category,
                    permit.target_dates.len()
                );
            }
        }

        Command::TestSms => {
            pipeline::send_test_message(&config)
                .await
                .inspect_err(|e| log::error!("Test SMS failed: {}", e))?;
        }
    }

    Ok(())
}
