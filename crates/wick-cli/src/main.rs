// ABOUTME: Entry point for the wick CLI
// ABOUTME: Loads .env, parses flags, sets up logging and runs the chosen command

use anyhow::Result;
use clap::Parser;
use wick_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    wick_log::init_with_debug(cli.debug);

    wick_cli::run(cli).await
}
