//! Relaysim CLI - Command-line interface
//!
//! Runs the satellite relay simulation and prints its report.

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use relaysim_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "relaysim")]
#[command(about = "Packet-level simulation of a two-hop satellite relay")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info, global = true)]
    log_level: CliLogLevel,

    /// Directory for the full trace log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to initialize logging")?;

    commands::handle_command(cli.command)
}
