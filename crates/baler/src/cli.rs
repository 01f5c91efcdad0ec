//! Command line interface definition.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Baler: simulation driver for the weighted straw placement core.
#[derive(Parser)]
#[command(name = "baler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the placement/rebalance scenario and print distribution tables.
    Simulate(SimulateArgs),
    /// Print version information.
    Version,
}

/// Selection strategy to simulate.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StrategyArg {
    /// Log-transform draw (arg-max).
    Straw2,
    /// Moment-approximation draw (arg-min), no log table.
    #[default]
    Straw2Plus,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    #[default]
    Text,
    /// One JSON document per report.
    Json,
}

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Number of objects to place in each fill phase.
    #[arg(short = 'n', long, default_value = "1000000")]
    pub objects: u32,

    /// Number of items; item weights default to 1..=items.
    #[arg(short, long, default_value = "10")]
    pub items: u32,

    /// Explicit comma-separated item weights (overrides --items).
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Option<Vec<i64>>,

    /// Selection strategy.
    #[arg(short, long, default_value = "straw2-plus")]
    pub strategy: StrategyArg,

    /// Items appended one at a time in the growth phase.
    #[arg(long, default_value = "5")]
    pub grow: u32,

    /// Use the reject-and-retry selector and print an attempt histogram.
    #[arg(long)]
    pub retry: bool,

    /// Output format (text, json).
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}
