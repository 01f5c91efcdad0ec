//! Baler: simulation driver for the weighted straw placement core.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod report;
mod sim;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => sim::run(&args),
        Commands::Version => {
            println!("baler {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
