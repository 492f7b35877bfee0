//! waitless entry point.

mod cli;
mod config;
mod core;
mod directory;
mod error;
mod logging;
mod web;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Keep the guard alive so buffered log lines flush on exit.
    let _guard = logging::init_logging()?;

    cli.command.run().await?;
    Ok(())
}
