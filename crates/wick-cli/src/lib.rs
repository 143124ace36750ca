// ABOUTME: Library side of the wick binary: argument definitions and command dispatch
// ABOUTME: main.rs only loads the environment, initialises logging and calls run()

use anyhow::Result;
use tokio::signal;
use tracing::info;

pub mod commands;
pub mod connect;

pub use commands::{Cli, Command, ConnectArgs, PoolArgs};

/// Run the parsed command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let connect = cli.connect;
    match cli.command {
        Command::Join(args) => commands::join::run(&connect, args).await,
        Command::Subscribe(args) => commands::subscribe::run(&connect, args).await,
        Command::Publish(args) => commands::publish::run(&connect, args).await,
        Command::Register(args) => commands::register::run(&connect, args).await,
        Command::Call(args) => commands::call::run(&connect, args).await,
        Command::Keygen => commands::keygen::run(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
