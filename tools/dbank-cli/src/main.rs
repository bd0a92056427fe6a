//! dbank command-line front end.
//!
//! Drives the wallet session, transaction ledger and transfer service
//! against the simulated wallet, persisting the ledger under a data
//! directory so successive runs see earlier transactions.

mod cli;
mod commands;
mod timer;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Session futures are single-threaded.
    let local = tokio::task::LocalSet::new();
    local.run_until(commands::run(cli)).await
}
