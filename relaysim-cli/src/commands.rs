//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use relaysim_core::RelayConfig;
use relaysim_sim::{SimulationReport, run_simulation};
use tracing::info;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay simulation and print its report
    Run {
        /// JSON configuration file, defaults plus environment overrides otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Maximum simulated time in seconds
        #[arg(long)]
        max_time: Option<f64>,
        /// Log every buffer loss, corruption and delivery
        #[arg(short, long)]
        verbose: bool,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as JSON
    Config {
        /// JSON configuration file to merge over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Overrides given on the command line, applied last.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunOverrides {
    pub seed: Option<u64>,
    pub max_time: Option<f64>,
    pub verbose: bool,
}

impl RunOverrides {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(max_time) = self.max_time {
            config.simulation.max_time_s = max_time;
        }
        if self.verbose {
            config.simulation.verbose = true;
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            config,
            seed,
            max_time,
            verbose,
            json,
        } => {
            let overrides = RunOverrides {
                seed,
                max_time,
                verbose,
            };
            let report = run(config.as_deref(), overrides)?;
            print_report(&report, json)
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Loads the configuration from a file, or from defaults and the environment.
///
/// # Errors
/// - File cannot be read or is not valid configuration JSON
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RelayConfig> {
    match path {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(RelayConfig::from_env()),
    }
}

/// Runs the simulation with command-line overrides applied.
///
/// # Errors
/// - Configuration cannot be loaded or fails validation
/// - Simulation stopped on invariant violations
pub fn run(path: Option<&Path>, overrides: RunOverrides) -> anyhow::Result<SimulationReport> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config);

    info!(
        seed = config.simulation.seed,
        max_time = config.simulation.max_time_s,
        "Running relay simulation"
    );
    run_simulation(&config).context("Simulation failed")
}

fn print_report(report: &SimulationReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}
